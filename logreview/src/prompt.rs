use crate::error::ReviewError;
use crate::records::ExampleRow;
use crate::table;
use itertools::Itertools;
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

/// Marker carried by the degenerate prompt produced when no example matches.
pub const NO_EXAMPLES_MARKER: &str = "No template examples found";

const ROLE_LINE: &str = "You are a log template optimization assistant. Please learn the rules of template review and modification according to the following sample. Among them, the parameter placeholder is composed of two angle brackets and an asterisk: <*>.";

const SINGLE_TASK_LINE: &str = "You need to: (1) According to the sample log, check if there are any lable errors in the template and correct them; (2) Determine if there are any variable recognition errors: Whether all the corresponding placeholders in a template are truly variables and whether there are any other variables that have not been recognized. Note: The log template must conform to the original log. There is no need to enhance readability, add punctuation, or follow human grammar.";

const MULTI_TASK_LINE: &str = "You need to: (1) According to the sample log, check if there are any label errors in the template and correct them; (2) Determine if there are any variable recognition errors: Whether all the corresponding placeholders in a template are truly variables and whether there are any other variables that have not been recognized. Note: The log template must conform to the original log. There is no need to enhance readability, add punctuation, or follow human grammar.";

const SINGLE_FORMAT_LINE: &str = "The following are examples that has been manually reviewed and revised. Please output the content in a format similar to JSON without any explanation or markdown wrapping:";

const MULTI_FORMAT_LINE: &str = "The following are examples that have been manually reviewed and revised. Please output the content in a format similar to JSON without any explanation or markdown wrapping:";

// Shapes and example blocks keep the exact whitespace of the wording the
// model was tuned on, indentation and trailing spaces included.
const SINGLE_SHAPE: &str = concat!(
    "\n",
    "{\n",
    "  \"Revised_template\": \"example_log <*> example_log\"\n",
    "  \"Revision_suggestions\": \"The original template is complete.\"\n",
    "}\n",
    "        ",
);

const MULTI_SHAPE: &str = concat!(
    "\n",
    "[\n",
    "  {\n",
    "    \"EventId\": \"E123\",\n",
    "    \"System\": \"System_name\",\n",
    "    \"Revised_template\": \"example_log <*> example_log\",\n",
    "    \"Revision_suggestions\": \"The original template is complete.\"\n",
    "  },\n",
    "  ...\n",
    "]\n",
    "\n",
    "        ",
);

const SINGLE_FIELD_INDENT: &str = "            ";
const SINGLE_BLOCK_TAIL: &str = "        ";

/// The two prompt wordings the model has been tuned against. They differ in
/// the expected response shape and in how each example block is laid out, so
/// they are kept apart rather than merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// One system, one template per request, single JSON object back.
    SingleSystem,
    /// Any number of systems, a batch per request, JSON array back.
    MultiSystem,
}

impl PromptTemplate {
    fn preamble(self) -> [&'static str; 5] {
        match self {
            PromptTemplate::SingleSystem => [ROLE_LINE, SINGLE_TASK_LINE, SINGLE_FORMAT_LINE, SINGLE_SHAPE, ""],
            PromptTemplate::MultiSystem => [ROLE_LINE, MULTI_TASK_LINE, MULTI_FORMAT_LINE, MULTI_SHAPE, ""],
        }
    }

    fn render_example(self, row: &ExampleRow) -> String {
        let indent = match self {
            PromptTemplate::SingleSystem => SINGLE_FIELD_INDENT,
            PromptTemplate::MultiSystem => "",
        };
        let mut block = String::from("\n");
        if self == PromptTemplate::MultiSystem {
            // Full-width colon is part of the wording the model was tuned on.
            let _ = writeln!(block, "System：{}", row.system.trim());
        }
        let _ = writeln!(block, "{indent}EventId: {}", row.event_id.trim());
        let _ = writeln!(block, "{indent}Original_log: {}", row.content.trim());
        let _ = writeln!(block, "{indent}Event_template: {}", row.event_template.trim());
        let _ = writeln!(block, "{indent}Revised_template: {}", row.revised.trim());
        let _ = writeln!(block, "{indent}Guideline: {}", row.guideline.trim());
        match self {
            PromptTemplate::SingleSystem => block.push_str(SINGLE_BLOCK_TAIL),
            PromptTemplate::MultiSystem => block.push_str("---\n"),
        }
        block
    }

    fn not_found(self, systems: &[&str]) -> String {
        match self {
            PromptTemplate::SingleSystem => {
                format!("{NO_EXAMPLES_MARKER} for system = {}.", systems.iter().join(", "))
            }
            PromptTemplate::MultiSystem => {
                format!("{NO_EXAMPLES_MARKER} for systems: [{}].", systems.iter().join(", "))
            }
        }
    }
}

/// Render the system prompt from every usable example whose System is one of
/// `systems`. Falls back to a "not found" notice rather than failing.
pub fn build_system_prompt<S: AsRef<str>>(
    examples: &[ExampleRow],
    template: PromptTemplate,
    systems: &[S],
) -> String {
    let wanted: Vec<&str> = systems.iter().map(|s| s.as_ref()).collect();
    let selected: Vec<&ExampleRow> = examples
        .iter()
        .filter(|row| row.is_usable())
        .filter(|row| wanted.contains(&row.system.as_str()))
        .collect();

    if selected.is_empty() {
        return template.not_found(&wanted);
    }

    let mut lines: Vec<String> = template.preamble().iter().map(|s| s.to_string()).collect();
    lines.extend(selected.into_iter().map(|row| template.render_example(row)));
    lines.join("\n")
}

pub fn prompt_for_system(examples: &[ExampleRow], system: &str) -> String {
    build_system_prompt(examples, PromptTemplate::SingleSystem, &[system])
}

pub fn prompt_for_systems<S: AsRef<str>>(examples: &[ExampleRow], systems: &[S]) -> String {
    build_system_prompt(examples, PromptTemplate::MultiSystem, systems)
}

pub fn load_examples<R: Read>(reader: R) -> Result<Vec<ExampleRow>, ReviewError> {
    table::read_records(reader, "examples", ExampleRow::REQUIRED_COLUMNS)
}

pub fn load_examples_from_path(path: &Path) -> Result<Vec<ExampleRow>, ReviewError> {
    table::read_records_from_path(path, "examples", ExampleRow::REQUIRED_COLUMNS)
}
