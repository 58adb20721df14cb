// ABOUTME: Index-qualified names and relative paths for generated tool artifacts.
// ABOUTME: Shared by the assembler (writes them) and the bridge (looks them up).

/// Directory, relative to the package root, that holds generated tools.
pub const TOOLS_DIR: &str = "tools";

/// Identifier given to the template's type definition for the agent at `index`.
pub fn tool_name(index: usize) -> String {
    format!("agent{}", index)
}

/// Relative path of the schema document for the agent at `index`.
pub fn schema_path(index: usize) -> String {
    format!("{}/{}.yaml", TOOLS_DIR, tool_name(index))
}

/// Relative path of the specialized source for the agent at `index`.
pub fn source_path(index: usize) -> String {
    format!("{}/{}.rs", TOOLS_DIR, tool_name(index))
}
