pub mod question_loader;
pub mod toml_loader;

pub use question_loader::{load_question_set, normalize_script_literal, parse_question_literal};
pub use toml_loader::{is_html_file, list_html_files, load_config_file};
