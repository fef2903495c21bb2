//! Constants used throughout the VaultMD core crate.
//!
//! Strings here are part of observable formats (merged text, prompts, stored records) and
//! must not change casually.

use std::time::Duration;

/// Separator placed between document fragments in the merged text.
pub const MERGE_SEPARATOR: &str = "\n---\n";

/// Instruction line that opens every generation prompt.
pub const PROMPT_INSTRUCTION: &str = "Generate op note and billing ICD-10 and CPT codes for billing purposes and medical records documentation";

/// Heading placed above the merged text in the generation prompt.
pub const PROMPT_DETAILS_HEADING: &str = "Procedure Details:";

/// Default directory for procedure data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "procedure_data";

/// Directory name for stored procedure records.
pub const PROCEDURES_DIR_NAME: &str = "procedures";

/// Filename for a stored procedure record.
pub const PROCEDURE_RECORD_FILENAME: &str = "procedure.yaml";

/// How long a "saved" notice stays visible.
pub const SAVED_NOTICE_TTL: Duration = Duration::from_secs(3);

/// How long a "save failed" notice stays visible.
pub const SAVE_FAILED_NOTICE_TTL: Duration = Duration::from_secs(5);
