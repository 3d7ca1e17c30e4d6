use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    RowNotFound,
    HeaderNotFound,
    CustomerNotFound,
    NotEditing,
    InvalidCellValue,
    DateOrderViolation,
    RequiredFieldMissing,
    EmptyBulkEdit,
    DeletionBlocked,
    IncompleteRows,
    SnapshotChecksumMismatch,
    SnapshotWriteFailed,
    LockContention,
    ImportColumnUnknown,
    ImportParseFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::RowNotFound => "E2001",
            Self::HeaderNotFound => "E2002",
            Self::CustomerNotFound => "E2003",
            Self::NotEditing => "E2004",
            Self::InvalidCellValue => "E2005",
            Self::DateOrderViolation => "E2006",
            Self::RequiredFieldMissing => "E2007",
            Self::EmptyBulkEdit => "E2008",
            Self::DeletionBlocked => "E2009",
            Self::IncompleteRows => "E2010",
            Self::SnapshotChecksumMismatch => "E3001",
            Self::SnapshotWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::ImportColumnUnknown => "E6001",
            Self::ImportParseFailed => "E6002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Pricebook not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::RowNotFound => "Price item not found",
            Self::HeaderNotFound => "Price header not found",
            Self::CustomerNotFound => "Customer not found",
            Self::NotEditing => "Sheet is not in edit mode",
            Self::InvalidCellValue => "Invalid cell value",
            Self::DateOrderViolation => "Expiration date must follow effective date",
            Self::RequiredFieldMissing => "Required field missing",
            Self::EmptyBulkEdit => "Bulk edit has nothing to apply",
            Self::DeletionBlocked => "Deletion blocked by effective date",
            Self::IncompleteRows => "Incomplete draft rows",
            Self::SnapshotChecksumMismatch => "Snapshot checksum mismatch",
            Self::SnapshotWriteFailed => "Snapshot write failed",
            Self::LockContention => "Lock contention",
            Self::ImportColumnUnknown => "Unknown import column",
            Self::ImportParseFailed => "Import parse failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `pb init` to create a pricebook here."),
            Self::ConfigParseError => Some("Fix syntax in .pricebook/config.toml and retry."),
            Self::RowNotFound | Self::HeaderNotFound | Self::CustomerNotFound => None,
            Self::NotEditing => Some("Enter edit mode before changing prices."),
            Self::InvalidCellValue => Some("Dates use YYYY-MM-DD; units use EA, CS, BX, PL, LB, KG, GAL, L."),
            Self::DateOrderViolation => Some("Set the expiration date after the effective date."),
            Self::RequiredFieldMissing => {
                Some("Provide a product name and a unit price greater than zero.")
            }
            Self::EmptyBulkEdit => Some("Select at least one row and set at least one field."),
            Self::DeletionBlocked => {
                Some("Expire the price instead; effective pricing cannot be removed retroactively.")
            }
            Self::IncompleteRows => Some("Complete or discard the draft rows before saving."),
            Self::SnapshotChecksumMismatch => {
                Some("Restore .pricebook/snapshot.json from backup or re-import your data.")
            }
            Self::SnapshotWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other `pb` process releases its lock."),
            Self::ImportColumnUnknown => Some("Use the column names produced by `pb export`."),
            Self::ImportParseFailed => Some("Check the delimiter and quoting of the input file."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
