//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Protocol rule sets for requests, responses and response masks.
//!
//! Every `check_*` method validates one entity into the caller's [`Report`] and
//! returns whether it added any failure. Nested entities are always checked,
//! even after an earlier failure.

pub mod mask;
pub mod request;
pub mod response;

use std::collections::HashMap;

use crate::model::{FrequencyRange, VendorExtension};
use crate::settings::ValidatorSettings;
use crate::validation::{with_common, Report};

pub use mask::MaskValidator;
pub use request::RequestValidator;
pub use response::ResponseValidator;

/// Unsupported versions only warn; comparisons may still work.
pub(crate) fn check_version(version: &str, settings: &ValidatorSettings, report: &mut Report) {
    report.advise(settings.supports_version(version), || {
        format!(
            "Message version ({version}) is not in list of supported versions ({}). \
             Errors in validation and comparison may result.",
            settings.supported_versions.join(", ")
        )
    });
}

pub(crate) fn check_frequency_range(range: &FrequencyRange, report: &mut Report) -> bool {
    with_common(range, report, |range, report| {
        report.require(range.high_frequency > range.low_frequency, || {
            format!(
                "highFrequency ({}) should be greater than lowFrequency ({})",
                range.high_frequency, range.low_frequency
            )
        });
    })
}

pub(crate) fn check_vendor_extensions(
    extensions: Option<&[VendorExtension]>,
    report: &mut Report,
) -> bool {
    report.section(|report| {
        for extension in extensions.unwrap_or_default() {
            with_common(extension, report, |_, _| {});
        }
    })
}

/// Errors once for every identifier that appears more than once.
pub(crate) fn check_unique_ids<'a>(
    ids: impl IntoIterator<Item = &'a str>,
    container: &str,
    report: &mut Report,
) -> bool {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for id in ids {
        let count = counts.entry(id).or_insert(0);
        if *count == 0 {
            order.push(id);
        }
        *count += 1;
    }
    report.section(|report| {
        for id in order {
            let count = counts[id];
            if count > 1 {
                report.error(format!(
                    "{container} should have no more than one occurrence of any given requestId; \
                     {id} appears {count} times"
                ));
            }
        }
    })
}

/// A list that is present must not be empty.
pub(crate) fn check_non_empty<T>(list: &[T], what: &str, report: &mut Report) -> bool {
    report.require(!list.is_empty(), || {
        format!("{what} is present but the list is empty")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Severity;

    #[test]
    fn unknown_version_is_advisory() {
        let mut report = Report::detached();
        check_version("1.3", &ValidatorSettings::default(), &mut report);
        assert!(report.is_valid());
        assert_eq!(report.count(Severity::Warning), 1);
    }

    #[test]
    fn duplicate_ids_reported_once_each() {
        let mut report = Report::detached();
        let ok = check_unique_ids(["A", "B", "A", "A", "C", "C"], "Response", &mut report);
        assert!(!ok);
        assert_eq!(report.failure_count(), 2);
        assert!(report.violations()[0].message.contains("A appears 3 times"));
    }

    #[test]
    fn frequency_range_ordering() {
        let mut report = Report::detached();
        assert!(check_frequency_range(&FrequencyRange::new(5925.0, 6425.0), &mut report));
        assert!(!check_frequency_range(&FrequencyRange::new(6425.0, 6425.0), &mut report));
        assert_eq!(report.failure_count(), 1);
    }
}
