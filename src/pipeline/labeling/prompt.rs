use crate::types::ModerationLabel;

/// Build the moderation prompt for one batch.
///
/// Each review is quoted verbatim as a `- ` bullet; the model is asked to
/// echo it back in the `review` field so answers can be matched to rows.
pub fn build_prompt<S: AsRef<str>>(reviews: &[S]) -> String {
    let categories = ModerationLabel::CATEGORIES
        .iter()
        .enumerate()
        .map(|(i, label)| format!("{}. {}", i + 1, label))
        .collect::<Vec<_>>()
        .join("\n");
    let reviews_text = reviews
        .iter()
        .map(|r| format!("- {}", r.as_ref()))
        .collect::<Vec<_>>()
        .join("\n");
    let label_choices = ModerationLabel::CATEGORIES
        .iter()
        .map(ModerationLabel::as_str)
        .collect::<Vec<_>>()
        .join("|");

    format!(
        "You are an expert content moderator. Classify each restaurant review into one of:\n\
         \n\
         {categories}\n\
         \n\
         Reviews to classify:\n\
         {reviews_text}\n\
         \n\
         Return ONLY valid JSON in the form:\n\
         [\n\
         {{\"review\": \"text\", \"label\": \"{label_choices}\"}}\n\
         ]\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_categories_and_quotes_reviews() {
        let prompt = build_prompt(&["Great   coffee!!", "Visit www.cheap-pills.example"]);

        assert!(prompt.contains("1. Advertisement\n2. Irrelevant\n3. Rant\n4. Valid"));
        assert!(prompt.contains("- Great   coffee!!\n- Visit www.cheap-pills.example"));
        assert!(prompt.contains(r#"{"review": "text", "label": "Advertisement|Irrelevant|Rant|Valid"}"#));
    }

    #[test]
    fn empty_batch_still_builds() {
        let prompt = build_prompt::<&str>(&[]);
        assert!(prompt.contains("Reviews to classify:"));
        assert!(!prompt.contains("- "));
    }
}
