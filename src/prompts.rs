// Style instructions sent to the model for each note mode

use crate::models::Mode;

/// Reserved bullet delimiter the model must put in front of every note
pub const BULLET_DELIMITER: &str = "///";

const MARKETING_STYLE: &str = "You are a product marketer who also understands software \
development. You receive the diff of a merged pull request. Write release notes for end \
users: describe only the benefit each change brings them, in plain language that someone \
without engineering experience understands.";

const DEVELOPER_STYLE: &str = "You are a senior software engineer. You receive the diff of a \
merged pull request. Write concise technical release notes that state what changed and why. \
Lead each note with a semantic verb such as Added, Fixed, Refactored or Removed.";

const OUTPUT_RULES: &str = "Output only the notes. Do not address anyone, do not greet, do \
not ask questions and do not comment on the task. Be concise and use few adjectives. Start \
every distinct note with \"///\" as its bullet marker and never write \"///\" anywhere else.";

/// Full instruction text for a mode: its style followed by the shared output rules
pub fn instructions_for(mode: Mode) -> String {
    let style = match mode {
        Mode::Marketing => MARKETING_STYLE,
        Mode::Developer => DEVELOPER_STYLE,
    };
    format!("{style}\n\n{OUTPUT_RULES}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instructions_differ_by_mode() {
        let marketing = instructions_for(Mode::Marketing);
        let developer = instructions_for(Mode::Developer);
        assert_ne!(marketing, developer);
        assert!(marketing.starts_with(MARKETING_STYLE));
        assert!(developer.starts_with(DEVELOPER_STYLE));
    }

    #[test]
    fn test_instructions_carry_output_rules() {
        for mode in [Mode::Marketing, Mode::Developer] {
            let instructions = instructions_for(mode);
            assert!(instructions.ends_with(OUTPUT_RULES));
            assert!(instructions.contains(BULLET_DELIMITER));
        }
    }

    #[test]
    fn test_instructions_are_deterministic() {
        assert_eq!(
            instructions_for(Mode::Developer),
            instructions_for(Mode::from_label("unknown"))
        );
    }
}
