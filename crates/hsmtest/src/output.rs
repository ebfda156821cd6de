// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormat {
    pub quiet: bool,
    pub compact: bool,
}

impl OutputFormat {
    pub fn output_str(&self, operation: &str, subject: &str, object: &str) {
        if self.quiet {
            return;
        }
        println!("{}", self.render(operation, subject, object));
    }

    pub fn output(&self, operation: &str, subject: &str, object: &impl Serialize) {
        if self.quiet {
            return;
        }
        self.output_str(operation, subject, &self.json_to_string(object))
    }

    pub fn render(&self, operation: &str, subject: &str, object: &str) -> String {
        if self.compact {
            format!("{operation} {subject}: {object}")
        } else {
            format!("{operation} {subject}:\n{object}\n")
        }
    }

    pub fn json_to_string(&self, object: &impl Serialize) -> String {
        let json = if self.compact {
            serde_json::to_string(object)
        } else {
            serde_json::to_string_pretty(object)
        };
        json.unwrap_or_else(|err| format!("<unserializable: {err}>"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_is_one_line() {
        let fmt = OutputFormat {
            quiet: false,
            compact: true,
        };
        let json = fmt.json_to_string(&serde_json::json!({"hex": "00ff"}));
        assert_eq!(
            fmt.render("rand-reader", "projects/p/locations/l", &json),
            r#"rand-reader projects/p/locations/l: {"hex":"00ff"}"#
        );
    }

    #[test]
    fn pretty_is_multi_line() {
        let fmt = OutputFormat::default();
        let json = fmt.json_to_string(&serde_json::json!({"hex": "00ff"}));
        assert_eq!(
            fmt.render("rand-reader", "l", &json),
            "rand-reader l:\n{\n  \"hex\": \"00ff\"\n}\n"
        );
    }
}
