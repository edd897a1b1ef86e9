//! Prompt construction for documentation generation.

use crate::generator::DocTarget;

pub(crate) const SYSTEM_PROMPT: &str = "\
You are an expert technical writer producing code documentation.
Write clear, well-structured Markdown.

Guidelines:
1. Open with an overview of purpose and responsibilities.
2. Document functions, classes, and methods: purpose, parameters with
   types, return values, and usage examples where they help.
3. Mention dependencies and related files when the context shows them.
4. Use headers, code blocks, and lists; be concise but thorough.
5. Describe what the code does, not how it is implemented, unless the
   implementation matters to callers.";

/// Search query used to retrieve context for the documentation request.
pub(crate) fn build_query(file_path: &str, target: &DocTarget) -> String {
    match target {
        DocTarget::File => format!(
            "Documentation for {file_path}: purpose, functions, classes, and usage"
        ),
        DocTarget::Symbol(name) => format!(
            "Documentation for function {name} in {file_path}: purpose, parameters, \
             return value, and usage"
        ),
    }
}

pub(crate) fn user_prompt(file_path: &str, target: &DocTarget, context: &str) -> String {
    match target {
        DocTarget::File => format!(
            "Generate documentation for the file: {file_path}\n\n\
             Use the following context from the codebase to understand \
             relationships and dependencies:\n\n{context}\n\n\
             Produce complete Markdown documentation covering:\n\
             1. File Overview\n\
             2. Purpose and Responsibilities\n\
             3. Key Functions/Classes\n\
             4. Dependencies\n\
             5. Usage Examples\n\
             6. Related Files\n\n\
             Documentation:"
        ),
        DocTarget::Symbol(name) => format!(
            "Generate documentation for the function '{name}' in file: {file_path}\n\n\
             Use the following context from the codebase:\n\n{context}\n\n\
             Produce Markdown documentation covering:\n\
             1. Function Purpose\n\
             2. Parameters (with types and descriptions)\n\
             3. Return Value (with type and description)\n\
             4. Usage Examples\n\
             5. Related Functions/Dependencies\n\
             6. Notes or Warnings (if applicable)\n\n\
             Documentation:"
        ),
    }
}
