//! Prompt templates for the analysis stage
//!
//! Templates use `{{categories}}`, `{{budgets}}`, and `{{current_date}}`
//! placeholders and can be overridden per deployment through
//! [`PipelineOptions`](crate::PipelineOptions).

use chrono::NaiveDate;

use tally_types::{Budget, Category};

/// Default system prompt for transaction analysis
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"你是专业的财务助手，负责从用户描述中提取记账信息。

可用分类：
{{categories}}

{{budgets}}

当前日期：{{current_date}}

请从用户描述中提取以下信息，并仅以JSON格式返回，不要输出其他内容：
{
  "amount": 金额（数字）,
  "date": "YYYY-MM-DD，描述中的相对日期（如昨天、前天）请按当前日期换算，未提及则使用当前日期",
  "categoryId": "最匹配的分类ID，必须来自可用分类",
  "categoryName": "分类名称",
  "type": "EXPENSE 或 INCOME",
  "budgetName": "描述中提及的预算或人员名称，没有则省略该字段",
  "note": "简短备注",
  "confidence": 置信度，0到1之间的数字
}"#;

/// Render a system prompt template with the candidate lists
pub fn render_system_prompt(
    template: &str,
    categories: &[Category],
    budgets: &[Budget],
    today: NaiveDate,
) -> String {
    let category_list = categories
        .iter()
        .map(|c| c.prompt_label())
        .collect::<Vec<_>>()
        .join(",");

    let budget_list = if budgets.is_empty() {
        String::new()
    } else {
        let lines = budgets
            .iter()
            .map(|b| format!("- 预算名称: {}, ID: {}", b.display_name(), b.id))
            .collect::<Vec<_>>()
            .join("\n");
        format!("预算列表：\n{lines}")
    };

    template
        .replace("{{categories}}", &category_list)
        .replace("{{budgets}}", &budget_list)
        .replace("{{current_date}}", &today.format("%Y-%m-%d").to_string())
}

/// Render the user prompt for one description
pub fn render_user_prompt(description: &str, today: NaiveDate) -> String {
    format!("用户描述: {description}\n当前日期: {}", today.format("%Y-%m-%d"))
}
