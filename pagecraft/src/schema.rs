//! Response schemas and prompts sent to the generator.

/// Shape of an [`EditPlan`](crate::instructions::EditPlan).
pub const EDIT_PLAN_SCHEMA: &str = r#"{
  "type": "OBJECT",
  "properties": {
    "operations": {
      "type": "ARRAY",
      "description": "search/replace edits for simple text, color and class changes",
      "items": {
        "type": "OBJECT",
        "properties": {
          "search": { "type": "STRING", "description": "exact HTML to find, whitespace included" },
          "replace": { "type": "STRING", "description": "HTML to put in its place" },
          "description": { "type": "STRING", "description": "what this edit changes" }
        },
        "required": ["search", "replace"]
      }
    },
    "actions": {
      "type": "ARRAY",
      "description": "structural edits such as adding, removing or reordering pricing plans",
      "items": {
        "type": "OBJECT",
        "properties": {
          "type": {
            "type": "STRING",
            "enum": ["ADD_PLAN", "DELETE_PLAN", "UPDATE_PLAN", "REORDER_PLANS", "SET_EXPIRATION", "CLEAR_EXPIRATION", "ADD_BULLET_POINT", "REMOVE_BULLET_POINT", "SET_HIGHLIGHT", "BULK_UPDATE_PRICING"]
          },
          "data": { "type": "OBJECT", "description": "parameters for the action" },
          "description": { "type": "STRING", "description": "what this action does" }
        },
        "required": ["type", "data"]
      }
    },
    "response": {
      "type": "OBJECT",
      "description": "reply shown to the user",
      "properties": {
        "summary": { "type": "STRING", "description": "one or two sentences on what was done" },
        "details": { "type": "ARRAY", "items": { "type": "STRING" } },
        "suggestions": { "type": "ARRAY", "description": "at most two related ideas", "items": { "type": "STRING" } },
        "clarification": { "type": "STRING", "description": "a specific question when the request is too vague" }
      },
      "required": ["summary"]
    }
  },
  "required": ["response"]
}"#;

/// Shape of a [`RepairResponse`](crate::repair::RepairResponse).
pub const REPAIR_SCHEMA: &str = r#"{
  "type": "OBJECT",
  "properties": {
    "fixedHTML": { "type": "STRING", "description": "the complete corrected HTML document" },
    "fixDescription": { "type": "STRING", "description": "which errors were fixed" },
    "success": { "type": "BOOLEAN", "description": "whether the document could be fixed" }
  },
  "required": ["fixedHTML", "fixDescription", "success"]
}"#;

pub const EDIT_PROMPT: &str = "You are the assistant of a promotion page builder. \
You edit a single HTML page by combining search/replace operations and structural actions.

Use operations for simple edits: headings, descriptions, prices, CSS variables such as \
--primary-color, toggling classes such as `active`.

Use actions for structural edits:
- ADD_PLAN {planData: {title, price, features[], isRecommended}}
- DELETE_PLAN {index}
- UPDATE_PLAN {index, name?, price?, type?, description?}
- REORDER_PLANS {order[]}
- BULK_UPDATE_PRICING {plans: [{name, price, type, description}]}
- SET_EXPIRATION {date, message?}
- CLEAR_EXPIRATION {}
- ADD_BULLET_POINT {planIndex, bulletPoint}
- REMOVE_BULLET_POINT {planIndex, bulletIndex}
- SET_HIGHLIGHT {planIndex, highlighted}

Plan indices start at 0. Combine operations and actions when a request needs both.
Always fill in response.summary. If the request is too vague, leave operations and \
actions empty and ask a specific question in response.clarification.

Example: \"Rename the title to Winter Sale\" becomes
{\"operations\": [{\"search\": \"<h1 class=\\\"brand-name\\\" contenteditable=\\\"true\\\" id=\\\"brand-name\\\">JasonCom</h1>\",
\"replace\": \"<h1 class=\\\"brand-name\\\" contenteditable=\\\"true\\\" id=\\\"brand-name\\\">Winter Sale</h1>\",
\"description\": \"rename brand\"}], \"actions\": [], \"response\": {\"summary\": \"Renamed the title to Winter Sale.\"}}";

pub const REPAIR_PROMPT: &str = "You fix HTML syntax errors.

Return the complete corrected document. Keep the existing content, layout and styles. \
Close unclosed tags, quote attribute values and fix anything else that breaks HTML5 parsing, \
changing only what is needed. Set success to false if the document cannot be fixed.";

/// Prompt for an edit request against `current_html`.
pub fn edit_prompt(current_html: &str, message: &str) -> String {
    format!(
        "{EDIT_PROMPT}\n\nCurrent HTML:\n```html\n{current_html}\n```\n\n\
         User request: \"{message}\"\n\n\
         Match the search strings exactly against the HTML above, including whitespace and line breaks."
    )
}

/// Prompt asking for a corrected version of `candidate_html`.
pub fn repair_prompt(candidate_html: &str, error: &str, context: &str) -> String {
    format!(
        "{REPAIR_PROMPT}\n\nError: {error}\nOriginal request: \"{context}\"\n\n\
         HTML to fix:\n```html\n{candidate_html}\n```"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionType;
    use facet_value::Value;

    #[test]
    fn schemas_are_json() {
        for schema in [EDIT_PLAN_SCHEMA, REPAIR_SCHEMA] {
            let value: Value = facet_json::from_str(schema).unwrap();
            assert!(value.as_object().is_some());
        }
    }

    #[test]
    fn edit_schema_lists_every_action() {
        for t in ActionType::ALL {
            assert!(EDIT_PLAN_SCHEMA.contains(&format!("\"{t}\"")), "{t} missing");
        }
    }

    #[test]
    fn edit_prompt_embeds_document_and_request() {
        let prompt = edit_prompt("<html></html>", "make it red");
        assert!(prompt.starts_with(EDIT_PROMPT));
        assert!(prompt.contains("```html\n<html></html>\n```"));
        assert!(prompt.contains("\"make it red\""));
    }
}
