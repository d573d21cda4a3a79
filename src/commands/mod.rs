pub mod analyze_cmd;
pub mod base_commands;
pub mod quality_cmd;
pub mod report_format;
