use std::{fmt, io::Write};

use anyhow::Context;
use clap::ValueEnum;
use perky::{engine, Identifier, Preprocessed};
use serde::Serialize;
use tracing::instrument;

use super::Workspace;

#[derive(Debug, clap::Args)]
pub struct Report {
    /// Output format (default: plain).
    #[arg(long, value_enum, default_value_t)]
    output_format: OutputFormat,
}

/// Supported output formats.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plain => "plain",
            Self::Json => "json",
        })
    }
}

/// What a report lists.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Listing {
    Defined,
    Pairs,
    Referenced,
}

#[derive(Debug, Serialize)]
struct Pair<'a> {
    requirement: &'a Identifier,
    reference: Option<&'a Identifier>,
}

impl Report {
    #[instrument(skip(workspace))]
    pub fn run(self, workspace: &Workspace, listing: Listing) -> anyhow::Result<()> {
        let lines = workspace.read_input()?;
        let preprocessed = engine::preprocess(&lines, &mut workspace.config.id_factory());
        let text = render(&preprocessed, listing, self.output_format)?;

        let mut out = workspace.open_output()?;
        out.write_all(text.as_bytes())
            .and_then(|()| out.flush())
            .context("failed to write report")?;
        Ok(())
    }
}

fn render(
    preprocessed: &Preprocessed,
    listing: Listing,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let ids = |list: Vec<&Identifier>| -> anyhow::Result<String> {
        Ok(match format {
            OutputFormat::Plain => list.iter().map(|id| format!("{id}\n")).collect(),
            OutputFormat::Json => {
                serde_json::to_string_pretty(&list).context("failed to render json output")? + "\n"
            }
        })
    };

    match listing {
        Listing::Defined => ids(preprocessed.defined.iter().collect()),
        Listing::Referenced => {
            let referenced = preprocessed.referenced();
            ids(referenced.iter().collect())
        }
        Listing::Pairs => {
            let pairs: Vec<Pair<'_>> = preprocessed
                .pairs()
                .map(|(requirement, reference)| Pair {
                    requirement,
                    reference,
                })
                .collect();
            Ok(match format {
                OutputFormat::Plain => pairs
                    .iter()
                    .map(|pair| {
                        let reference = pair.reference.map_or("-", Identifier::as_str);
                        format!("{} {reference}\n", pair.requirement)
                    })
                    .collect(),
                OutputFormat::Json => {
                    serde_json::to_string_pretty(&pairs).context("failed to render json output")?
                        + "\n"
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preprocessed(text: &str) -> Preprocessed {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        engine::preprocess(&lines, &mut perky::IdFactory::default())
    }

    const DOCUMENT: &str = "PRK-INC A\nPRK-INC B\nPRK-REQ C\nc\n-- PRK-REQ\nPRK-LNK A B\nPRK-DRV B\nPRK-FWD X";

    #[test]
    fn plain_listings() {
        let pre = preprocessed(DOCUMENT);

        assert_eq!(
            render(&pre, Listing::Defined, OutputFormat::Plain).unwrap(),
            "A\nB\nC\n"
        );
        assert_eq!(
            render(&pre, Listing::Pairs, OutputFormat::Plain).unwrap(),
            "A B\nB -\n"
        );
        assert_eq!(
            render(&pre, Listing::Referenced, OutputFormat::Plain).unwrap(),
            "B\nX\n"
        );
    }

    #[test]
    fn json_pairs() {
        let pre = preprocessed(DOCUMENT);
        let text = render(&pre, Listing::Pairs, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(
            value,
            serde_json::json!([
                { "requirement": "A", "reference": "B" },
                { "requirement": "B", "reference": null },
            ])
        );
    }

    #[test]
    fn json_ids() {
        let pre = preprocessed(DOCUMENT);
        let text = render(&pre, Listing::Defined, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!(["A", "B", "C"]));
    }
}
