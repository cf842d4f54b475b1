//! Error types for the tabbench core library.
//!
//! Every public error enum carries a stable machine-readable code so the CLI
//! can report failures in structured logs without parsing display strings.

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error raised by a [`crate::Device`] allocator or stream.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum DeviceError {
    /// The allocation would exceed the device memory limit.
    #[error("allocation of {requested} bytes exceeds the limit ({in_use} of {limit} bytes in use)")]
    OutOfMemory {
        /// Bytes requested by the failing allocation.
        requested: usize,
        /// Bytes already held by live allocations.
        in_use: usize,
        /// Configured byte limit of the device.
        limit: usize,
    },
    /// A copy was issued between buffers of different lengths.
    #[error("copy length mismatch: buffer holds {expected} elements but {actual} were supplied")]
    LengthMismatch {
        /// Number of elements held by the device buffer.
        expected: usize,
        /// Number of elements in the host slice.
        actual: usize,
    },
    /// The byte size of a buffer did not fit in `usize`.
    #[error("buffer of {len} elements overflows the addressable byte size")]
    SizeOverflow {
        /// Requested element count.
        len: usize,
    },
    /// The device driver reported a failure.
    #[error("device driver failure: {message}")]
    Driver {
        /// Driver-provided description of the failure.
        message: String,
    },
}

define_error_codes! {
    /// Stable codes describing [`DeviceError`] variants.
    enum DeviceErrorCode for DeviceError {
        /// The allocation would exceed the device memory limit.
        OutOfMemory => OutOfMemory { .. } => "TABBENCH_DEVICE_OUT_OF_MEMORY",
        /// A copy was issued between buffers of different lengths.
        LengthMismatch => LengthMismatch { .. } => "TABBENCH_DEVICE_LENGTH_MISMATCH",
        /// The byte size of a buffer did not fit in `usize`.
        SizeOverflow => SizeOverflow { .. } => "TABBENCH_DEVICE_SIZE_OVERFLOW",
        /// The device driver reported a failure.
        Driver => Driver { .. } => "TABBENCH_DEVICE_DRIVER",
    }
}

/// A dataset shape or content invariant was violated.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ShapeError {
    /// `rows * cols` overflowed `usize`.
    #[error("dataset of {rows} rows and {cols} cols overflows usize")]
    Overflow {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
    },
    /// The feature matrix length did not equal `rows * cols`.
    #[error("feature matrix holds {actual} values but the shape requires {expected}")]
    FeatureLengthMismatch {
        /// Length implied by the shape.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
    /// The label vector length did not equal `rows`.
    #[error("label vector holds {actual} values but the shape requires {expected}")]
    LabelLengthMismatch {
        /// Length implied by the shape.
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },
    /// A label fell outside `[0, classes)`.
    #[error("label {label} at row {row} is outside [0, {classes})")]
    LabelOutOfRange {
        /// Row holding the offending label.
        row: usize,
        /// The offending label.
        label: i32,
        /// Number of classes in the dataset.
        classes: usize,
    },
}

define_error_codes! {
    /// Stable codes describing [`ShapeError`] variants.
    enum ShapeErrorCode for ShapeError {
        /// `rows * cols` overflowed `usize`.
        Overflow => Overflow { .. } => "TABBENCH_SHAPE_OVERFLOW",
        /// The feature matrix length did not equal `rows * cols`.
        FeatureLengthMismatch => FeatureLengthMismatch { .. } => "TABBENCH_SHAPE_FEATURE_LENGTH",
        /// The label vector length did not equal `rows`.
        LabelLengthMismatch => LabelLengthMismatch { .. } => "TABBENCH_SHAPE_LABEL_LENGTH",
        /// A label fell outside `[0, classes)`.
        LabelOutOfRange => LabelOutOfRange { .. } => "TABBENCH_SHAPE_LABEL_RANGE",
    }
}

/// Errors raised while validating or running the blob generator.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BlobsError {
    /// The requested row count was zero.
    #[error("row count must be greater than zero")]
    ZeroRows,
    /// The requested column count was zero.
    #[error("column count must be greater than zero")]
    ZeroCols,
    /// The requested cluster count was zero.
    #[error("cluster count must be greater than zero")]
    ZeroClusters,
    /// More clusters were requested than rows.
    #[error("cluster count ({clusters}) must not exceed row count ({rows})")]
    ClusterCountExceedsRowCount {
        /// Number of clusters requested.
        clusters: usize,
        /// Number of rows requested.
        rows: usize,
    },
    /// The cluster standard deviation was negative or not finite.
    #[error("cluster std-deviation must be finite and non-negative (got {value})")]
    InvalidClusterStd {
        /// The rejected value.
        value: f32,
    },
    /// The center bounding box was empty or not finite.
    #[error("center box must satisfy min < max with finite bounds (got [{min}, {max}])")]
    InvalidCenterBox {
        /// Lower bound of the box.
        min: f32,
        /// Upper bound of the box.
        max: f32,
    },
    /// The cluster count does not fit in an `i32` label.
    #[error("cluster count {clusters} does not fit in an i32 label")]
    LabelOverflow {
        /// Number of clusters requested.
        clusters: usize,
    },
    /// The feature matrix would not fit in an addressable allocation.
    #[error("feature matrix of {rows} rows and {cols} cols exceeds the addressable byte size")]
    SizeOverflow {
        /// Number of rows requested.
        rows: usize,
        /// Number of columns requested.
        cols: usize,
    },
    /// Host memory for the generated data could not be reserved.
    #[error("failed to reserve {bytes} bytes of host memory for generated data")]
    HostAllocation {
        /// Bytes that could not be reserved.
        bytes: usize,
    },
    /// The generated data violated a dataset invariant.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

define_error_codes! {
    /// Stable codes describing [`BlobsError`] variants.
    enum BlobsErrorCode for BlobsError {
        /// The requested row count was zero.
        ZeroRows => ZeroRows => "TABBENCH_BLOBS_ZERO_ROWS",
        /// The requested column count was zero.
        ZeroCols => ZeroCols => "TABBENCH_BLOBS_ZERO_COLS",
        /// The requested cluster count was zero.
        ZeroClusters => ZeroClusters => "TABBENCH_BLOBS_ZERO_CLUSTERS",
        /// More clusters were requested than rows.
        ClusterCountExceedsRowCount => ClusterCountExceedsRowCount { .. } => "TABBENCH_BLOBS_TOO_MANY_CLUSTERS",
        /// The cluster standard deviation was negative or not finite.
        InvalidClusterStd => InvalidClusterStd { .. } => "TABBENCH_BLOBS_INVALID_STD",
        /// The center bounding box was empty or not finite.
        InvalidCenterBox => InvalidCenterBox { .. } => "TABBENCH_BLOBS_INVALID_CENTER_BOX",
        /// The cluster count does not fit in an `i32` label.
        LabelOverflow => LabelOverflow { .. } => "TABBENCH_BLOBS_LABEL_OVERFLOW",
        /// The feature matrix would not fit in an addressable allocation.
        SizeOverflow => SizeOverflow { .. } => "TABBENCH_BLOBS_SIZE_OVERFLOW",
        /// Host memory for the generated data could not be reserved.
        HostAllocation => HostAllocation { .. } => "TABBENCH_BLOBS_HOST_ALLOCATION",
        /// The generated data violated a dataset invariant.
        Shape => Shape { .. } => "TABBENCH_BLOBS_SHAPE",
    }
}

/// Errors raised while reading or writing the text dataset format.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum FormatError {
    /// The dataset file could not be opened for reading.
    #[error("failed to open `{path}` for reading: {source}")]
    Open {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The dataset file could not be created for writing.
    #[error("failed to open `{path}` for writing: {source}")]
    Create {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// Reading or writing the stream failed.
    #[error("I/O failure while handling dataset text: {0}")]
    Io(#[from] io::Error),
    /// The stream ended before the `rows cols classes` header was complete.
    #[error("input dataset is incorrect: no 'rows cols classes' info found (missing `{field}`)")]
    MissingHeader {
        /// Header field that was missing.
        field: &'static str,
    },
    /// A header field was not a non-negative integer.
    #[error("input dataset is incorrect: header field `{field}` is not a count: `{token}`")]
    MalformedHeader {
        /// Header field that failed to parse.
        field: &'static str,
        /// The offending token.
        token: String,
    },
    /// A header field was zero.
    #[error("input dataset is incorrect: header field `{field}` must be greater than zero")]
    ZeroHeaderCount {
        /// Header field that was zero.
        field: &'static str,
    },
    /// The stream ended before a feature value.
    #[error("failed to read input at row,col={row},{col}: unexpected end of input")]
    MissingFeature {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        col: usize,
    },
    /// A feature token was not a floating-point number.
    #[error("failed to read input at row,col={row},{col}: `{token}` is not a number")]
    MalformedFeature {
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        col: usize,
        /// The offending token.
        token: String,
    },
    /// The stream ended before a row label.
    #[error("failed to read the label at row={row}: unexpected end of input")]
    MissingLabel {
        /// Zero-based row index.
        row: usize,
    },
    /// A label token was not an integer.
    #[error("failed to read the label at row={row}: `{token}` is not an integer")]
    MalformedLabel {
        /// Zero-based row index.
        row: usize,
        /// The offending token.
        token: String,
    },
    /// The parsed values violated a dataset invariant.
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

define_error_codes! {
    /// Stable codes describing [`FormatError`] variants.
    enum FormatErrorCode for FormatError {
        /// The dataset file could not be opened for reading.
        Open => Open { .. } => "TABBENCH_FORMAT_OPEN",
        /// The dataset file could not be created for writing.
        Create => Create { .. } => "TABBENCH_FORMAT_CREATE",
        /// Reading or writing the stream failed.
        Io => Io { .. } => "TABBENCH_FORMAT_IO",
        /// The stream ended before the header was complete.
        MissingHeader => MissingHeader { .. } => "TABBENCH_FORMAT_MISSING_HEADER",
        /// A header field was not a non-negative integer.
        MalformedHeader => MalformedHeader { .. } => "TABBENCH_FORMAT_MALFORMED_HEADER",
        /// A header field was zero.
        ZeroHeaderCount => ZeroHeaderCount { .. } => "TABBENCH_FORMAT_ZERO_HEADER_COUNT",
        /// The stream ended before a feature value.
        MissingFeature => MissingFeature { .. } => "TABBENCH_FORMAT_MISSING_FEATURE",
        /// A feature token was not a floating-point number.
        MalformedFeature => MalformedFeature { .. } => "TABBENCH_FORMAT_MALFORMED_FEATURE",
        /// The stream ended before a row label.
        MissingLabel => MissingLabel { .. } => "TABBENCH_FORMAT_MISSING_LABEL",
        /// A label token was not an integer.
        MalformedLabel => MalformedLabel { .. } => "TABBENCH_FORMAT_MALFORMED_LABEL",
        /// The parsed values violated a dataset invariant.
        Shape => Shape { .. } => "TABBENCH_FORMAT_SHAPE",
    }
}

/// Error type produced when preparing a [`crate::Dataset`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The device allocator or stream failed.
    #[error("device `{device}` failed: {error}")]
    Device {
        /// Name of the device that produced the error.
        device: String,
        /// Underlying device error.
        #[source]
        error: DeviceError,
    },
    /// A shape or content invariant was violated.
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// Blob generation failed.
    #[error("blob generation failed: {0}")]
    Blobs(#[from] BlobsError),
    /// Reading or writing the text format failed.
    #[error(transparent)]
    Format(#[from] FormatError),
}

define_error_codes! {
    /// Stable codes describing [`DatasetError`] variants.
    enum DatasetErrorCode for DatasetError {
        /// The device allocator or stream failed.
        DeviceFailure => Device { .. } => "TABBENCH_DEVICE_FAILURE",
        /// A shape or content invariant was violated.
        InvalidShape => Shape { .. } => "TABBENCH_INVALID_SHAPE",
        /// Blob generation failed.
        BlobsFailure => Blobs { .. } => "TABBENCH_BLOBS_FAILURE",
        /// Reading or writing the text format failed.
        FormatFailure => Format { .. } => "TABBENCH_FORMAT_FAILURE",
    }
}

impl DatasetError {
    /// Wrap a [`DeviceError`] raised by the named device.
    #[must_use]
    pub fn device(device: &str, error: DeviceError) -> Self {
        Self::Device {
            device: device.to_owned(),
            error,
        }
    }

    /// Retrieve the most specific code of the wrapped error, if any.
    ///
    /// # Examples
    /// ```
    /// use tabbench_core::{BlobsError, DatasetError};
    ///
    /// let err = DatasetError::from(BlobsError::ZeroRows);
    /// let detail = err.detail_code();
    /// assert_eq!(detail, Some("TABBENCH_BLOBS_ZERO_ROWS"));
    /// ```
    #[must_use]
    pub const fn detail_code(&self) -> Option<&'static str> {
        match self {
            Self::Device { error, .. } => Some(error.code().as_str()),
            Self::Shape(error) => Some(error.code().as_str()),
            Self::Blobs(error) => Some(error.code().as_str()),
            Self::Format(error) => Some(error.code().as_str()),
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T, E = DatasetError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(DatasetError::from(BlobsError::ZeroCols), "TABBENCH_BLOBS_FAILURE")]
    #[case(
        DatasetError::from(ShapeError::LabelLengthMismatch { expected: 2, actual: 1 }),
        "TABBENCH_INVALID_SHAPE"
    )]
    #[case(
        DatasetError::device("host", DeviceError::LengthMismatch { expected: 2, actual: 3 }),
        "TABBENCH_DEVICE_FAILURE"
    )]
    fn dataset_error_codes_are_stable(#[case] error: DatasetError, #[case] expected: &str) {
        assert_eq!(error.code().as_str(), expected);
        assert_eq!(error.code().to_string(), expected);
    }

    #[rstest]
    fn detail_code_reaches_the_wrapped_error() {
        let err = DatasetError::from(FormatError::MissingLabel { row: 3 });
        assert_eq!(err.detail_code(), Some("TABBENCH_FORMAT_MISSING_LABEL"));
    }

    #[rstest]
    fn format_messages_name_the_position() {
        let err = FormatError::MalformedFeature {
            row: 2,
            col: 5,
            token: "abc".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "failed to read input at row,col=2,5: `abc` is not a number"
        );
    }
}
