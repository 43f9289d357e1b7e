//! Metadata scrubbers: the ordered chain that rewrites revision metadata
//! before it is published into another repository.

use ferry_core::config::MetadataScrubberConfig;
use ferry_core::{Problem, RevisionMetadata};
use ferry_engine::Ui;
use regex::{NoExpand, Regex};
use std::rc::Rc;

const USER_REPLACEMENT: &str = "<user>";
const ORIGINAL_AUTHOR_KEY: &str = "ORIGINAL_AUTHOR";
const DATE_FORMAT: &str = "%Y/%m/%d";

pub trait MetadataScrubber {
    fn name(&self) -> &str;

    /// Whether [`execute`](Self::execute) runs for `config`.
    fn should_scrub(&self, _config: &MetadataScrubberConfig) -> bool {
        true
    }

    fn execute(
        &self,
        metadata: RevisionMetadata,
        config: &MetadataScrubberConfig,
    ) -> Result<RevisionMetadata, Problem>;

    /// Apply this scrubber. Without a config the metadata passes through.
    fn scrub(
        &self,
        metadata: RevisionMetadata,
        config: Option<&MetadataScrubberConfig>,
    ) -> Result<RevisionMetadata, Problem> {
        match config {
            Some(config) if self.should_scrub(config) => self.execute(metadata, config),
            _ => Ok(metadata),
        }
    }
}

/// The scrubbers every migration runs, in order.
pub fn default_scrubbers(ui: Rc<dyn Ui>) -> Vec<Box<dyn MetadataScrubber>> {
    vec![
        Box::new(UsernameScrubber),
        Box::new(OriginalAuthorScrubber { ui }),
        Box::new(PublicSectionScrubber),
        Box::new(DescriptionScrubber),
    ]
}

/// Replace every case-insensitive occurrence of each of `words` in the id,
/// author and description.
pub fn strip_from_all_fields(
    mut metadata: RevisionMetadata,
    words: &[String],
    replacement: &str,
    word_alone: bool,
) -> Result<RevisionMetadata, Problem> {
    for word in words {
        let escaped = regex::escape(word);
        let pattern = if word_alone {
            format!(r"(?i)\b{escaped}\b")
        } else {
            format!("(?i){escaped}")
        };
        let re = Regex::new(&pattern)
            .map_err(|e| Problem::new(format!("Bad scrub pattern for '{word}': {e}")))?;
        metadata.id = re.replace_all(&metadata.id, NoExpand(replacement)).into_owned();
        metadata.author = metadata
            .author
            .map(|a| re.replace_all(&a, NoExpand(replacement)).into_owned());
        metadata.description = re
            .replace_all(&metadata.description, NoExpand(replacement))
            .into_owned();
    }
    Ok(metadata)
}

// ---------------------------------------------------------------------------
// Usernames
// ---------------------------------------------------------------------------

pub struct UsernameScrubber;

impl MetadataScrubber for UsernameScrubber {
    fn name(&self) -> &str {
        "username"
    }

    fn should_scrub(&self, config: &MetadataScrubberConfig) -> bool {
        !config.usernames_to_scrub.is_empty()
    }

    fn execute(
        &self,
        metadata: RevisionMetadata,
        config: &MetadataScrubberConfig,
    ) -> Result<RevisionMetadata, Problem> {
        strip_from_all_fields(metadata, &config.usernames_to_scrub, USER_REPLACEMENT, true)
    }
}

// ---------------------------------------------------------------------------
// ORIGINAL_AUTHOR
// ---------------------------------------------------------------------------

/// Restores the author named by an `ORIGINAL_AUTHOR=` description line.
pub struct OriginalAuthorScrubber {
    ui: Rc<dyn Ui>,
}

impl OriginalAuthorScrubber {
    pub fn new(ui: Rc<dyn Ui>) -> Self {
        Self { ui }
    }

    /// Normalise to the `Name <address>` form.
    pub fn sanitize_author(&self, author: &str) -> Result<String, Problem> {
        let author = author.trim();
        let git_author = compile(r"^.*<.*>.*$")?;
        let email = compile(r"^.*(?i:\b[A-Z0-9._%+-]+@[A-Z0-9.-]+[.][A-Z]{2,}\b).*$")?;
        let username = compile(r"^(?i:\b[A-Z0-9._%+-]*\b)$")?;

        if git_author.is_match(author) {
            return Ok(author.to_string());
        }
        if email.is_match(author) {
            let user = author.split('@').next().unwrap_or(author);
            return Ok(format!("{user} <{author}>"));
        }
        if username.is_match(author) {
            return Ok(format!("{author} <{author}>"));
        }
        self.ui.message(&format!(
            "WARNING: unknown author format found in commit metadata: \"{author}\""
        ));
        Ok(format!("\"{author}\" <undetermined_user>"))
    }
}

fn compile(pattern: &str) -> Result<Regex, Problem> {
    Regex::new(pattern).map_err(|e| Problem::new(format!("Bad pattern {pattern}: {e}")))
}

impl MetadataScrubber for OriginalAuthorScrubber {
    fn name(&self) -> &str {
        "original_author"
    }

    fn should_scrub(&self, config: &MetadataScrubberConfig) -> bool {
        config.restore_original_author
    }

    fn execute(
        &self,
        mut metadata: RevisionMetadata,
        _config: &MetadataScrubberConfig,
    ) -> Result<RevisionMetadata, Problem> {
        let Some(original) = metadata.field(ORIGINAL_AUTHOR_KEY).map(str::to_owned) else {
            return Ok(metadata);
        };
        metadata.author = Some(self.sanitize_author(&original)?);
        let line = compile(&format!("{ORIGINAL_AUTHOR_KEY}=.*"))?;
        metadata.description = line.replacen(&metadata.description, 1, "").into_owned();
        Ok(metadata)
    }
}

// ---------------------------------------------------------------------------
// Public: sections
// ---------------------------------------------------------------------------

/// Keeps only the lines after a `Public:` header, up to the last blank line
/// that follows it.
pub struct PublicSectionScrubber;

impl MetadataScrubber for PublicSectionScrubber {
    fn name(&self) -> &str {
        "public_section"
    }

    fn execute(
        &self,
        mut metadata: RevisionMetadata,
        _config: &MetadataScrubberConfig,
    ) -> Result<RevisionMetadata, Problem> {
        let lines: Vec<&str> = metadata.description.split('\n').collect();
        let mut section: Option<(usize, usize)> = None;
        for (index, line) in lines.iter().enumerate() {
            let trimmed = line.trim();
            if trimmed.strip_suffix(':') == Some("Public") {
                section = Some((index, lines.len()));
            } else if let Some((start, _)) = section {
                if trimmed.is_empty() {
                    section = Some((start, index));
                }
            }
        }
        if let Some((start, end)) = section {
            metadata.description = lines[start + 1..end].join("\n");
        }
        Ok(metadata)
    }
}

// ---------------------------------------------------------------------------
// Log format
// ---------------------------------------------------------------------------

/// Rewrites the description through the configured `log_format`.
pub struct DescriptionScrubber;

impl MetadataScrubber for DescriptionScrubber {
    fn name(&self) -> &str {
        "description"
    }

    fn execute(
        &self,
        mut metadata: RevisionMetadata,
        config: &MetadataScrubberConfig,
    ) -> Result<RevisionMetadata, Problem> {
        let parents = metadata
            .parents
            .iter()
            .map(|p| p.rev_id.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        metadata.description = config
            .log_format
            .replace("{id}", &metadata.id)
            .replace("{author}", metadata.author.as_deref().unwrap_or(""))
            .replace("{date}", &metadata.date.format(DATE_FORMAT).to_string())
            .replace("{description}", &metadata.description)
            .replace("{parents}", &parents);
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use ferry_core::Revision;
    use ferry_engine::RecordingUi;

    fn metadata(author: &str, description: &str) -> RevisionMetadata {
        RevisionMetadata::new(
            "100",
            Some(author.to_string()),
            Utc.with_ymd_and_hms(2012, 7, 9, 6, 0, 0).unwrap(),
            description,
            vec![Revision::new("1", "r"), Revision::new("2", "r")],
        )
    }

    #[test]
    fn scrubs_usernames_as_whole_words() {
        let config = MetadataScrubberConfig {
            usernames_to_scrub: vec!["saget".into()],
            ..Default::default()
        };
        let md = metadata("Bob Saget <saget@x.com>", "by saget, not sagetty");
        let scrubbed = UsernameScrubber.scrub(md, Some(&config)).unwrap();
        assert_eq!(scrubbed.author.as_deref(), Some("Bob <user> <<user>@x.com>"));
        assert_eq!(scrubbed.description, "by <user>, not sagetty");
    }

    #[test]
    fn no_config_means_no_scrubbing() {
        let md = metadata("a", "Foo\nPublic:\nbar");
        let same = PublicSectionScrubber.scrub(md.clone(), None).unwrap();
        assert_eq!(same, md);
    }

    #[test]
    fn public_section_is_extracted() {
        let config = MetadataScrubberConfig::default();
        let md = metadata("a", "Private stuff\n\nPublic:\nGood stuff\nmore\n\nTrailer");
        let scrubbed = PublicSectionScrubber.scrub(md, Some(&config)).unwrap();
        assert_eq!(scrubbed.description, "Good stuff\nmore");

        let md = metadata("a", "Nothing public here");
        let scrubbed = PublicSectionScrubber.scrub(md, Some(&config)).unwrap();
        assert_eq!(scrubbed.description, "Nothing public here");
    }

    #[test]
    fn description_follows_log_format() {
        let config = MetadataScrubberConfig {
            log_format: "{id} by {author} on {date} ({parents}): {description}".into(),
            ..Default::default()
        };
        let md = metadata("a <a@x.com>", "desc");
        let scrubbed = DescriptionScrubber.scrub(md, Some(&config)).unwrap();
        assert_eq!(scrubbed.description, "100 by a <a@x.com> on 2012/07/09 (1, 2): desc");
    }

    #[test]
    fn original_author_is_restored() {
        let ui = Rc::new(RecordingUi::default());
        let scrubber = OriginalAuthorScrubber::new(ui.clone());
        let config = MetadataScrubberConfig {
            restore_original_author: true,
            ..Default::default()
        };
        let md = metadata("robot <robot@x.com>", "Fix\nORIGINAL_AUTHOR=jane@y.org\nend")
            .with_parsed_fields();
        let scrubbed = scrubber.scrub(md, Some(&config)).unwrap();
        assert_eq!(scrubbed.author.as_deref(), Some("jane <jane@y.org>"));
        assert_eq!(scrubbed.description, "Fix\n\nend");
        assert!(ui.messages().is_empty());
    }

    #[test]
    fn sanitizes_author_formats() {
        let ui = Rc::new(RecordingUi::default());
        let scrubber = OriginalAuthorScrubber::new(ui.clone());
        assert_eq!(scrubber.sanitize_author("A <a@b.com>").unwrap(), "A <a@b.com>");
        assert_eq!(scrubber.sanitize_author(" jdoe ").unwrap(), "jdoe <jdoe>");
        assert_eq!(
            scrubber.sanitize_author("two words").unwrap(),
            "\"two words\" <undetermined_user>"
        );
        assert_eq!(ui.messages().len(), 1);
    }
}
