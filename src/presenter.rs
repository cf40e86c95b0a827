use crate::types::DetectionResult;

/// What the result card should show. Derived from an optional
/// `DetectionResult` so the three states are explicit instead of hanging off
/// the truthiness of a nullable plate string.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionView {
    Empty,
    Detected {
        image_url: String,
        message: String,
        plate: String,
    },
    NotDetected {
        image_url: String,
        message: String,
    },
}

impl DetectionView {
    pub fn from_result(result: Option<&DetectionResult>) -> DetectionView {
        match result {
            None => DetectionView::Empty,
            Some(result) => match result.number_plate.as_deref() {
                Some(plate) if !plate.is_empty() => DetectionView::Detected {
                    image_url: result.image_url.clone(),
                    message: result.message.clone(),
                    plate: plate.to_string(),
                },
                _ => DetectionView::NotDetected {
                    image_url: result.image_url.clone(),
                    message: result.message.clone(),
                },
            },
        }
    }

    /// Renders the result card. `Empty` renders nothing at all.
    pub fn render(&self) -> String {
        match self {
            DetectionView::Empty => String::new(),
            DetectionView::Detected {
                image_url,
                message,
                plate,
            } => {
                let plate_block = format!(
                    "<div class=\"plate-panel\">\
                     <h3>Number Plate:</h3>\
                     <span class=\"plate-text\">{}</span>\
                     </div>",
                    escape(plate)
                );
                card(image_url, "badge-detected", "Detected", message, &plate_block)
            }
            DetectionView::NotDetected { image_url, message } => {
                card(image_url, "badge-not-detected", "Not Detected", message, "")
            }
        }
    }
}

fn card(image_url: &str, badge_class: &str, badge_label: &str, message: &str, extra: &str) -> String {
    format!(
        "<div class=\"result-card\">\
         <div class=\"result-image\"><img src=\"{}\" alt=\"Uploaded car image\"></div>\
         <div class=\"result-body\">\
         <span class=\"badge {}\">{}</span>\
         <p class=\"result-message\">{}</p>\
         {}\
         </div>\
         </div>",
        escape(image_url),
        badge_class,
        badge_label,
        escape(message),
        extra
    )
}

const STYLE: &str = "\
body{font-family:sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem}\
.result-card{background:#fff;border-radius:.5rem;box-shadow:0 1px 4px rgba(0,0,0,.2);margin-top:2rem;overflow:hidden}\
.result-image img{display:block;max-height:16rem;width:100%;object-fit:contain}\
.result-body{padding:1.5rem}\
.badge{border-radius:1rem;padding:.25rem .75rem;font-size:.875rem;font-weight:600}\
.badge-detected{background:#dcfce7;color:#166534}\
.badge-not-detected{background:#fef9c3;color:#854d0e}\
.result-message{display:inline;margin-left:.5rem;color:#374151}\
.plate-panel{background:#e5e7eb;border-radius:.5rem;margin-top:1rem;padding:1rem;text-align:center}\
.plate-panel h3{margin:0 0 .5rem;font-size:1.125rem;text-align:left}\
.plate-text{font-family:monospace;font-size:1.5rem;letter-spacing:.1em}\
.error{color:#b91c1c}";

/// Full page shell: upload form, then either an error line or the result
/// card from `view`.
pub fn render_page(view: &DetectionView, error: Option<&str>) -> String {
    let mut body = String::new();
    body.push_str("<h1>Number Plate Detector</h1>");
    body.push_str(
        "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"file\" accept=\"image/*\">\
         <button type=\"submit\">Detect Plate</button>\
         </form>",
    );
    if let Some(message) = error {
        body.push_str(&format!("<p class=\"error\">{}</p>", escape(message)));
    }
    body.push_str(&view.render());
    format!(
        "<!DOCTYPE html>\
         <html lang=\"en\">\
         <head><meta charset=\"utf-8\"><title>Number Plate Detector</title>\
         <style>{}</style></head>\
         <body>{}</body>\
         </html>",
        STYLE, body
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(plate: Option<&str>) -> DetectionResult {
        DetectionResult {
            success: true,
            image_url: "/img/1.jpg".to_string(),
            message: "Plate found".to_string(),
            number_plate: plate.map(str::to_string),
        }
    }

    #[test]
    fn no_result_renders_nothing() {
        let view = DetectionView::from_result(None);
        assert_eq!(view, DetectionView::Empty);
        assert_eq!(view.render(), "");
    }

    #[test]
    fn plate_renders_detected_badge_and_plate_block() {
        let result = result(Some("ABC123"));
        let html = DetectionView::from_result(Some(&result)).render();
        assert!(html.contains(">Detected</span>"));
        assert!(html.contains("badge-detected"));
        assert!(html.contains("ABC123"));
        assert!(html.contains("plate-panel"));
        assert!(html.contains("Plate found"));
        assert!(html.contains("src=\"/img/1.jpg\""));
    }

    #[test]
    fn null_plate_renders_not_detected_without_plate_block() {
        let result = result(None);
        let html = DetectionView::from_result(Some(&result)).render();
        assert!(html.contains(">Not Detected</span>"));
        assert!(html.contains("badge-not-detected"));
        assert!(!html.contains("plate-panel"));
        assert!(html.contains("Plate found"));
    }

    #[test]
    fn empty_plate_string_counts_as_not_detected() {
        let result = result(Some(""));
        let view = DetectionView::from_result(Some(&result));
        assert!(matches!(view, DetectionView::NotDetected { .. }));
    }

    #[test]
    fn rendering_is_idempotent() {
        let result = result(Some("XYZ 789"));
        let view = DetectionView::from_result(Some(&result));
        assert_eq!(view.render(), view.render());
    }

    #[test]
    fn interpolated_values_are_escaped() {
        let result = DetectionResult {
            success: true,
            image_url: "/img/1.jpg\"><script>".to_string(),
            message: "a < b & c".to_string(),
            number_plate: Some("<PLATE>".to_string()),
        };
        let html = DetectionView::from_result(Some(&result)).render();
        assert!(!html.contains("<script>"));
        assert!(html.contains("a &lt; b &amp; c"));
        assert!(html.contains("&lt;PLATE&gt;"));
    }

    #[test]
    fn page_includes_upload_form_and_error_line() {
        let html = render_page(&DetectionView::Empty, Some("No file uploaded"));
        assert!(html.contains("enctype=\"multipart/form-data\""));
        assert!(html.contains("name=\"file\""));
        assert!(html.contains("class=\"error\""));
        assert!(html.contains("No file uploaded"));
    }
}
