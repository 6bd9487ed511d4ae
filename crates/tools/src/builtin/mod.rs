//! Built-in HR Tools
//!
//! Registered in a fixed order; when several tools claim a question the
//! first one wins.

mod analyze_department;
mod compare_departments;
mod distribution_stats;
mod find_employee;

use std::sync::Arc;

pub use analyze_department::AnalyzeDepartmentTool;
pub use compare_departments::CompareDepartmentsTool;
pub use distribution_stats::DistributionStatsTool;
pub use find_employee::FindEmployeeTool;

use crate::trait_def::ToolRegistry;

/// Name of the distribution tool, used for visualization-style questions.
pub const DISTRIBUTION_TOOL: &str = "distribution_stats";

/// Registry with every built-in tool.
pub fn builtin_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(FindEmployeeTool));
    registry.register(Arc::new(CompareDepartmentsTool));
    registry.register(Arc::new(DistributionStatsTool));
    registry.register(Arc::new(AnalyzeDepartmentTool));
    registry
}
