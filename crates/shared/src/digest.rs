use chrono::{DateTime, Datelike, Local};

use crate::models::{DigestDocument, DigestEntry};

pub struct DigestComposer;

impl DigestComposer {
    /// English ordinal suffix for a day of month. Days 11-13 always take
    /// "th" regardless of their last digit.
    pub fn ordinal_suffix(day: u32) -> &'static str {
        match day % 100 {
            11..=13 => "th",
            _ => match day % 10 {
                1 => "st",
                2 => "nd",
                3 => "rd",
                _ => "th",
            },
        }
    }

    /// Format a run date as e.g. "November 3rd, 2025".
    pub fn format_run_date(date: DateTime<Local>) -> String {
        let day = date.day();
        format!(
            "{} {}{}, {}",
            date.format("%B"),
            day,
            Self::ordinal_suffix(day),
            date.year()
        )
    }

    /// Assemble the digest: one fragment per entry in fetch order, plus the
    /// inline image table built in lockstep so every `cid:` reference in
    /// the body has exactly one attachment entry.
    pub fn compose(entries: &[DigestEntry], run_date: DateTime<Local>) -> DigestDocument {
        let formatted_date = Self::format_run_date(run_date);
        let subject = format!("Daily News Digest - {}", formatted_date);

        let mut html = String::new();
        let mut inline_images = Vec::new();

        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
        html.push_str("  <meta charset=\"UTF-8\">\n");
        html.push_str(&format!("  <title>{}</title>\n", Self::escape_html(&subject)));
        html.push_str("  <style>\n");
        html.push_str("    body { font-family: Arial, sans-serif; max-width: 700px; margin: 40px auto; padding: 0 20px; line-height: 1.6; }\n");
        html.push_str("    h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; }\n");
        html.push_str("    h2 { color: #34495e; margin-bottom: 5px; }\n");
        html.push_str("    h3 { color: #2c3e50; margin: 15px 0 5px 0; }\n");
        html.push_str("    .byline { color: #7f8c8d; font-size: 0.9em; margin: 0; }\n");
        html.push_str("    .link { color: #3498db; text-decoration: none; }\n");
        html.push_str("    img { max-width: 100%; border-radius: 4px; margin: 10px 0; }\n");
        html.push_str("    hr { border: none; border-top: 1px solid #ddd; margin: 30px 0; }\n");
        html.push_str("  </style>\n");
        html.push_str("</head>\n<body>\n");

        html.push_str(&format!(
            "<h1>Daily News Digest<br><small>{}</small></h1>\n",
            Self::escape_html(&formatted_date)
        ));

        for (index, entry) in entries.iter().enumerate() {
            let ordinal = index + 1;
            let article = &entry.article;

            html.push_str("<div class=\"article\">\n");
            html.push_str(&format!(
                "  <h2>{}. <a href=\"{}\" class=\"link\">{}</a></h2>\n",
                ordinal,
                article.url,
                Self::escape_html(&article.title)
            ));

            if let Some(author) = &article.author {
                html.push_str(&format!(
                    "  <p class=\"byline\">By {}</p>\n",
                    Self::escape_html(author)
                ));
            }

            if let Some(image) = &entry.image {
                html.push_str(&format!(
                    "  <img src=\"cid:{}\" alt=\"\">\n",
                    image.content_id
                ));
                inline_images.push(image.clone());
            }

            html.push_str("  <h3>Gemini Summary</h3>\n");
            html.push_str(&format!(
                "  <p>{}</p>\n",
                Self::escape_html(&entry.summaries.primary)
            ));

            html.push_str("  <h3>OpenAI Summary</h3>\n");
            html.push_str(&format!(
                "  <p>{}</p>\n",
                Self::escape_html(&entry.summaries.secondary)
            ));

            html.push_str("</div>\n<hr>\n");
        }

        html.push_str("</body>\n</html>");

        DigestDocument {
            subject,
            html_body: html,
            inline_images,
        }
    }

    fn escape_html(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&#39;")
    }
}
