use super::Condition;

/// Writes conditions in the tagged-record format [`super::parse_report`] reads.
/// An empty likelihood is left out, like the generator does.
pub fn to_markup(conditions: &[Condition]) -> String {
    let mut out = String::from("<report>\n");

    for condition in conditions {
        out.push_str("  <condition>\n");
        leaf(&mut out, 4, "name", &condition.name);
        if !condition.likelihood.is_empty() {
            leaf(&mut out, 4, "likelihood", &condition.likelihood);
        }
        leaf(&mut out, 4, "description", &condition.description);

        out.push_str("    <treatments>\n");
        for treatment in &condition.treatments {
            leaf(&mut out, 6, "treatment", treatment);
        }
        out.push_str("    </treatments>\n");

        out.push_str("    <medicines>\n");
        for medicine in &condition.medicines {
            out.push_str("      <medicine>\n");
            leaf(&mut out, 8, "name", &medicine.name);
            leaf(&mut out, 8, "dosage", &medicine.dosage);
            out.push_str("        <alternatives>\n");
            for alternative in &medicine.alternatives {
                leaf(&mut out, 10, "alternative", alternative);
            }
            out.push_str("        </alternatives>\n");
            out.push_str("      </medicine>\n");
        }
        out.push_str("    </medicines>\n");
        out.push_str("  </condition>\n");
    }

    out.push_str("</report>\n");
    out
}

fn leaf(out: &mut String, indent: usize, tag: &str, value: &str) {
    out.push_str(&" ".repeat(indent));
    out.push_str(&format!("<{tag}>{}</{tag}>\n", escape(value)));
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Medicine;

    #[test]
    fn omits_empty_likelihood_and_escapes_text() {
        let markup = to_markup(&[Condition {
            name: "A & B".to_string(),
            medicines: vec![Medicine {
                name: "<x>".to_string(),
                ..Medicine::default()
            }],
            ..Condition::default()
        }]);

        assert!(!markup.contains("<likelihood>"));
        assert!(markup.contains("<name>A &amp; B</name>"));
        assert!(markup.contains("<name>&lt;x&gt;</name>"));
    }
}
