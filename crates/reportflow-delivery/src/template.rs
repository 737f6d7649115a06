//! Email body rendering: plain text plus a lightweight HTML alternative.

use crate::mailer::{FailureNotice, ReportSummary};

/// Plain-text success body.
pub fn report_text(recipient_name: &str, summary: &ReportSummary) -> String {
    let mut info = vec![
        format!("Report Name: {}", summary.report_name),
        format!("Report Type: {}", summary.report_type),
    ];
    if let Some(range) = &summary.date_range {
        info.push(format!("Date Range: {range}"));
    }
    info.push(format!("Store: {}", summary.shop));
    info.push(format!("Records: {}", summary.record_count));
    info.push(format!("File Size: {} KB", summary.file_size_kb));

    format!(
        "Hi {recipient_name},\n\n\
         Your scheduled report is ready!\n\n\
         REPORT SUMMARY\n\
         ==============\n\n\
         {}\n\n\
         ATTACHMENT\n\
         ==========\n\n\
         The report is attached to this email as a CSV file. You can open it \
         with Excel, Google Sheets, or any spreadsheet application.\n\n\
         Best regards,\n\
         The Report Flow Team\n",
        info.join("\n")
    )
}

/// HTML success body.
pub fn report_html(recipient_name: &str, summary: &ReportSummary) -> String {
    let mut rows = vec![
        info_row("Report Name", &summary.report_name),
        info_row("Report Type", &summary.report_type),
    ];
    if let Some(range) = &summary.date_range {
        rows.push(info_row("Date Range", range));
    }
    rows.push(info_row("Store", &summary.shop));
    rows.push(info_row("Records", &summary.record_count.to_string()));
    rows.push(info_row("File Size", &format!("{} KB", summary.file_size_kb)));

    format!(
        r#"<html><body style="font-family:sans-serif;color:#333;max-width:600px;margin:0 auto">
<h1 style="color:#5c6ac4">📊 {report_name}</h1>
<p>Hi {recipient_name},</p>
<p>Your scheduled report is ready! Please find the details below:</p>
<div style="background:#f9fafb;border-left:4px solid #5c6ac4;padding:16px">
<h2 style="margin-top:0">Report Summary</h2>
<table style="width:100%">{rows}</table>
</div>
<p style="background:#fff4e5;border:1px solid #ffc453;padding:12px">
<strong>📎 Attachment:</strong> The report is attached as a CSV file.</p>
<p>Best regards,<br>The Report Flow Team</p>
</body></html>"#,
        report_name = escape(&summary.report_name),
        recipient_name = escape(recipient_name),
        rows = rows.join("")
    )
}

/// Plain-text failure body: category, message, hints, and the execution id.
pub fn failure_text(notice: &FailureNotice) -> String {
    let tips = notice
        .category
        .troubleshooting_tips()
        .iter()
        .enumerate()
        .map(|(i, tip)| format!("{}. {tip}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "⚠️ REPORT EXECUTION FAILED\n\n\
         Hello,\n\n\
         Your scheduled report \"{name}\" failed to execute.\n\n\
         ERROR DETAILS\n\
         =============\n\
         Report Name: {name}\n\
         Report Type: {rtype}\n\
         Error Category: {category}\n\
         Error Message: {message}\n\
         Execution ID: {execution_id}\n\
         Store: {shop}\n\n\
         TROUBLESHOOTING TIPS\n\
         ====================\n\
         {tips}\n\n\
         WHAT HAPPENS NEXT?\n\
         ==================\n\
         - The report will automatically retry on its next scheduled run\n\
         - You can run the report manually to test\n\
         - Check the report history for more details\n\n\
         If this issue persists, contact support with the execution ID above.\n",
        name = notice.report_name,
        rtype = notice.report_type,
        category = notice.category.label(),
        message = notice.error_message,
        execution_id = notice.execution_id,
        shop = notice.shop,
    )
}

/// HTML failure body.
pub fn failure_html(notice: &FailureNotice) -> String {
    let tips = notice
        .category
        .troubleshooting_tips()
        .iter()
        .map(|tip| format!("<li>{}</li>", escape(tip)))
        .collect::<Vec<_>>()
        .join("");

    format!(
        r#"<html><body style="font-family:sans-serif;color:#333;max-width:600px;margin:0 auto">
<h1 style="color:#e74c3c">⚠️ Report Execution Failed</h1>
<p>Hello,</p>
<p>Your scheduled report <strong>"{name}"</strong> failed to execute.</p>
<div style="background:#f8f9fa;border-left:4px solid #e74c3c;padding:16px">
<h3 style="margin-top:0;color:#e74c3c">Error Details</h3>
<p><strong>Report Type:</strong> {rtype}</p>
<p><strong>Error Category:</strong> {category}</p>
<p><strong>Error Message:</strong> {message}</p>
<p><strong>Execution ID:</strong> {execution_id}</p>
<p><strong>Store:</strong> {shop}</p>
</div>
<div style="background:#fff3cd;border-left:4px solid #ffc107;padding:16px">
<h3 style="margin-top:0;color:#856404">💡 Troubleshooting Tips</h3>
<ul>{tips}</ul>
</div>
<p>The report will automatically retry on its next scheduled run. If this
issue persists, contact support with the execution ID above.</p>
</body></html>"#,
        name = escape(&notice.report_name),
        rtype = escape(&notice.report_type),
        category = notice.category.label(),
        message = escape(&notice.error_message),
        execution_id = escape(&notice.execution_id),
        shop = escape(&notice.shop),
    )
}

fn info_row(label: &str, value: &str) -> String {
    format!(
        r#"<tr><td style="font-weight:600;color:#6d7175;padding:4px 0">{}</td><td>{}</td></tr>"#,
        escape(label),
        escape(value)
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportflow_core::error::ErrorCategory;

    fn sample_notice() -> FailureNotice {
        FailureNotice {
            report_name: "Daily Sales".into(),
            report_type: "Sales Report".into(),
            error_message: "rate limited by Admin API: too many requests".into(),
            category: ErrorCategory::RateLimit,
            execution_id: "exec-123".into(),
            shop: "demo.myshopify.com".into(),
        }
    }

    #[test]
    fn test_failure_text_has_category_tips_and_id() {
        let body = failure_text(&sample_notice());
        assert!(body.contains("Admin API Rate Limit"));
        assert!(body.contains("exec-123"));
        for tip in ErrorCategory::RateLimit.troubleshooting_tips() {
            assert!(body.contains(tip), "missing tip: {tip}");
        }
    }

    #[test]
    fn test_failure_html_escapes_error_message() {
        let mut notice = sample_notice();
        notice.error_message = "bad <script> value".into();
        let body = failure_html(&notice);
        assert!(body.contains("bad &lt;script&gt; value"));
        assert!(!body.contains("<script>"));
    }

    #[test]
    fn test_report_text_summary_fields() {
        let summary = ReportSummary {
            report_name: "Weekly Orders".into(),
            report_type: "Orders Report".into(),
            record_count: 135,
            date_range: Some("Last 7 Days".into()),
            shop: "demo.myshopify.com".into(),
            file_size_kb: "12.40".into(),
        };
        let body = report_text("Ops", &summary);
        assert!(body.contains("Hi Ops,"));
        assert!(body.contains("Records: 135"));
        assert!(body.contains("Date Range: Last 7 Days"));
        assert!(body.contains("File Size: 12.40 KB"));
    }
}
