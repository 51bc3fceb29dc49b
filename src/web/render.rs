//! 页面渲染
//!
//! 服务端拼接的简单 HTML，不涉及样式主题

use crate::error::ValidationError;
use crate::models::survey::{PickQuestion, LEAD_LAP_MAX, LEAD_LAP_MIN};
use crate::models::{SurveyForm, PICK_QUESTIONS};
use crate::utils::html::escape_html;

pub const PAGE_TITLE: &str = "NASCAR Chicago Survey";

pub const SUCCESS_MESSAGE: &str =
    "✅ Thank you! Your entry has been received and a confirmation email sent.";
pub const SUCCESS_WITHOUT_EMAIL_MESSAGE: &str =
    "✅ Thank you! Your entry has been received, but we could not send the confirmation email.";
pub const ALREADY_SUBMITTED_MESSAGE: &str =
    "✅ You have already submitted an entry. Godspeed!";
pub const IN_PROGRESS_MESSAGE: &str = "⏳ Your entry is being submitted. Please wait.";
pub const STORE_FAILED_MESSAGE: &str =
    "🚫 We could not save your entry right now. Please try again.";

/// 表单页面，可附带校验错误和提示
pub fn form_page(form: &SurveyForm, errors: &[ValidationError], notice: Option<&str>) -> String {
    let mut body = String::new();

    if let Some(notice) = notice {
        body.push_str(&format!(
            "<p class=\"notice\">{}</p>\n",
            escape_html(notice)
        ));
    }

    if !errors.is_empty() {
        body.push_str("<ul class=\"errors\">\n");
        for err in errors {
            body.push_str(&format!(
                "  <li data-field=\"{}\">🚫 {}</li>\n",
                err.field(),
                escape_html(&err.to_string())
            ));
        }
        body.push_str("</ul>\n");
    }

    body.push_str("<form method=\"post\" action=\"/\">\n");
    body.push_str(&text_input(
        "Entry Name",
        "Please enter your name:",
        "entry_name",
        "text",
        &form.entry_name,
    ));
    body.push_str(&text_input(
        "Email Address",
        "Enter your email address:",
        "email",
        "email",
        &form.email,
    ));
    for question in PICK_QUESTIONS.iter() {
        body.push_str(&radio_group(question, form.pick(question.field)));
    }
    body.push_str(&format!(
        r#"<section>
  <h2>5. Number of Cars Finishing on Lead Lap (required)</h2>
  <label for="lead_lap">How Many Cars Finish on the Lead Lap?</label>
  <input id="lead_lap" name="lead_lap" type="number" min="{min}" max="{max}" placeholder="Out of {max}" value="{value}">
</section>
<button type="submit">Submit</button>
</form>
"#,
        min = LEAD_LAP_MIN,
        max = LEAD_LAP_MAX,
        value = escape_html(&form.lead_lap),
    ));

    page(&body)
}

/// 提交成功页面
pub fn success_page(email_sent: bool) -> String {
    let message = if email_sent {
        SUCCESS_MESSAGE
    } else {
        SUCCESS_WITHOUT_EMAIL_MESSAGE
    };
    message_page("success", message)
}

pub fn already_submitted_page() -> String {
    message_page("success", ALREADY_SUBMITTED_MESSAGE)
}

pub fn in_progress_page() -> String {
    message_page("notice", IN_PROGRESS_MESSAGE)
}

fn message_page(class: &str, message: &str) -> String {
    page(&format!(
        "<p class=\"{}\">{}</p>\n",
        class,
        escape_html(message)
    ))
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Chicago Road Race</title>
</head>
<body>
<h1>{title}</h1>
{body}</body>
</html>
"#,
        title = PAGE_TITLE,
        body = body
    )
}

fn text_input(heading: &str, label: &str, name: &str, kind: &str, value: &str) -> String {
    format!(
        r#"<section>
  <h2>{heading}</h2>
  <label for="{name}">{label}</label>
  <input id="{name}" name="{name}" type="{kind}" value="{value}">
</section>
"#,
        heading = heading,
        label = label,
        name = name,
        kind = kind,
        value = escape_html(value),
    )
}

fn radio_group(question: &PickQuestion, selected: Option<&str>) -> String {
    let mut out = format!(
        "<section>\n  <h2>{}</h2>\n",
        escape_html(question.title)
    );
    for (i, candidate) in question.candidates.iter().enumerate() {
        let id = format!("{}_{}", question.field, i);
        let checked = if selected == Some(*candidate) {
            " checked"
        } else {
            ""
        };
        out.push_str(&format!(
            "  <input id=\"{id}\" type=\"radio\" name=\"{field}\" value=\"{value}\"{checked}> <label for=\"{id}\">{value}</label><br>\n",
            id = id,
            field = question.field,
            value = escape_html(candidate),
            checked = checked,
        ));
    }
    out.push_str("</section>\n");
    out
}
