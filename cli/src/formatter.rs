use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Color, Row, Table};
use zmanim::{
    ActiveEventSet, BatchResponse, EventPatternMapping, TagAssociation, TagType, Value,
    ZmanDefinition, ZmanResult,
};

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn format_response(&self, response: &BatchResponse, raw: bool) -> String {
        if raw {
            return self.format_raw(response);
        }

        let mut output = String::new();
        output.push_str(&format!(
            "{} · {}\n",
            response.date,
            self.format_active_events(&response.active_events)
        ));

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("Zman").set_alignment(CellAlignment::Left),
            Cell::new("Time").set_alignment(CellAlignment::Right),
            Cell::new("Exact").set_alignment(CellAlignment::Left),
        ]));
        for result in &response.results {
            table.add_row(self.result_row(result));
        }
        output.push_str(&table.to_string());
        output.push('\n');

        if !response.excluded.is_empty() {
            output.push_str(&format!("Not today: {}\n", response.excluded.join(", ")));
        }
        output
    }

    /// One `key<TAB>value` line per result, for piping to other tools
    fn format_raw(&self, response: &BatchResponse) -> String {
        response
            .results
            .iter()
            .map(|result| {
                let value = result
                    .display
                    .clone()
                    .unwrap_or_else(|| result.value.to_string());
                format!("{}\t{}\n", result.key, value)
            })
            .collect()
    }

    fn result_row(&self, result: &ZmanResult) -> Row {
        match &result.value {
            Value::Time(time) => Row::from(vec![
                Cell::new(&result.key),
                Cell::new(result.display.as_deref().unwrap_or_default())
                    .set_alignment(CellAlignment::Right),
                Cell::new(time.format("%H:%M:%S %:z")),
            ]),
            Value::Duration(_) => Row::from(vec![
                Cell::new(&result.key),
                Cell::new(result.value.to_string()).set_alignment(CellAlignment::Right),
                Cell::new(""),
            ]),
            Value::Error(error) => Row::from(vec![
                Cell::new(&result.key),
                Cell::new(error.kind()).fg(Color::Red).set_alignment(CellAlignment::Right),
                Cell::new(error.to_string()),
            ]),
        }
    }

    pub fn format_active_events(&self, active: &ActiveEventSet) -> String {
        if active.is_empty() {
            "no active events".to_string()
        } else {
            active.iter().collect::<Vec<_>>().join(", ")
        }
    }

    pub fn format_workspace_summary(
        &self,
        file_count: usize,
        zmanim: &[ZmanDefinition],
        patterns: &[EventPatternMapping],
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Workspace contains {} files, {} zmanim, {} event patterns\n\n",
            file_count,
            zmanim.len(),
            patterns.len()
        ));

        if !zmanim.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_header(Row::from(vec!["Zman", "Formula", "Tags"]));
            for zman in zmanim {
                table.add_row(Row::from(vec![
                    zman.key.clone(),
                    zman.formula.clone(),
                    self.format_tags(&zman.tags),
                ]));
            }
            output.push_str(&table.to_string());
            output.push('\n');
        }

        for mapping in patterns {
            output.push_str(&format!(
                "{} → {} (priority {})\n",
                mapping.pattern, mapping.tag_key, mapping.priority
            ));
        }
        output
    }

    fn format_tags(&self, tags: &[TagAssociation]) -> String {
        tags.iter()
            .map(|tag| {
                let negation = if tag.is_negated { "!" } else { "" };
                match tag.tag_type {
                    TagType::Timing => format!("{}{} (timing)", negation, tag.tag_key),
                    TagType::Category => format!("{}{} (category)", negation, tag.tag_key),
                    TagType::Event | TagType::JewishDay => format!("{}{}", negation, tag.tag_key),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
