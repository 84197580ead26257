/// Resource limits to keep a single run predictable
///
/// Formulas are short and reference chains shallow in practice, so these
/// limits only bite on hostile or accidental inputs.
#[derive(Debug, Clone)]
pub struct ResourceLimits {
    /// Maximum formula source length in bytes
    /// Real usage: ~80 bytes, Limit: 4KB
    pub max_formula_bytes: usize,

    /// Maximum expression nesting depth (parentheses and call arguments)
    /// Real usage: ~3 levels, Limit: 64
    pub max_expression_depth: usize,

    /// Maximum length of an `@key` reference chain
    /// Real usage: ~4 hops, Limit: 64
    pub max_reference_depth: usize,

    /// Maximum wall-clock time for one batch run in milliseconds
    pub max_evaluation_time_ms: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_formula_bytes: 4 * 1024,
            max_expression_depth: 64,
            max_reference_depth: 64,
            max_evaluation_time_ms: 5000,
        }
    }
}

impl ResourceLimits {
    /// Create a new ResourceLimits with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_evaluation_time_ms(mut self, millis: u64) -> Self {
        self.max_evaluation_time_ms = millis;
        self
    }

    pub fn with_max_reference_depth(mut self, depth: usize) -> Self {
        self.max_reference_depth = depth;
        self
    }
}
