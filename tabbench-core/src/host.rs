//! Host-resident labeled datasets.

use crate::error::ShapeError;

/// Row, column and class counts of a labeled dataset.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DatasetShape {
    /// Number of rows (samples).
    pub rows: usize,
    /// Number of feature columns per row.
    pub cols: usize,
    /// Number of distinct classes; labels lie in `[0, classes)`.
    pub classes: usize,
}

impl DatasetShape {
    /// Creates a shape from its three counts.
    #[must_use]
    pub const fn new(rows: usize, cols: usize, classes: usize) -> Self {
        Self {
            rows,
            cols,
            classes,
        }
    }

    /// Returns `rows * cols`, the length of the feature matrix.
    ///
    /// # Errors
    /// Returns [`ShapeError::Overflow`] when the product overflows `usize`.
    ///
    /// # Examples
    /// ```
    /// use tabbench_core::DatasetShape;
    ///
    /// let shape = DatasetShape::new(4, 3, 2);
    /// assert_eq!(shape.feature_len(), Ok(12));
    /// ```
    pub const fn feature_len(&self) -> Result<usize, ShapeError> {
        match self.rows.checked_mul(self.cols) {
            Some(len) => Ok(len),
            None => Err(ShapeError::Overflow {
                rows: self.rows,
                cols: self.cols,
            }),
        }
    }
}

/// A labeled dataset held in host memory.
///
/// Features are stored row-major in a flat `Vec<f32>`; labels hold one
/// class index per row. Construction validates every invariant so a
/// `HostDataset` is always internally consistent.
#[derive(Clone, Debug, PartialEq)]
pub struct HostDataset {
    shape: DatasetShape,
    features: Vec<f32>,
    labels: Vec<i32>,
}

impl HostDataset {
    /// Builds a dataset after checking lengths and label ranges.
    ///
    /// # Errors
    /// Returns [`ShapeError`] when the feature length is not `rows * cols`,
    /// the label length is not `rows`, or a label lies outside
    /// `[0, classes)`.
    ///
    /// # Examples
    /// ```
    /// use tabbench_core::{DatasetShape, HostDataset};
    ///
    /// let dataset = HostDataset::new(
    ///     DatasetShape::new(2, 2, 2),
    ///     vec![0.0, 1.0, 2.0, 3.0],
    ///     vec![0, 1],
    /// )?;
    /// assert_eq!(dataset.row(1), Some(&[2.0_f32, 3.0][..]));
    /// # Ok::<(), tabbench_core::ShapeError>(())
    /// ```
    pub fn new(
        shape: DatasetShape,
        features: Vec<f32>,
        labels: Vec<i32>,
    ) -> Result<Self, ShapeError> {
        let expected = shape.feature_len()?;
        if features.len() != expected {
            return Err(ShapeError::FeatureLengthMismatch {
                expected,
                actual: features.len(),
            });
        }
        if labels.len() != shape.rows {
            return Err(ShapeError::LabelLengthMismatch {
                expected: shape.rows,
                actual: labels.len(),
            });
        }
        if let Some((row, &label)) = labels
            .iter()
            .enumerate()
            .find(|(_, label)| !label_in_range(**label, shape.classes))
        {
            return Err(ShapeError::LabelOutOfRange {
                row,
                label,
                classes: shape.classes,
            });
        }

        Ok(Self {
            shape,
            features,
            labels,
        })
    }

    /// Returns the dataset shape.
    #[must_use]
    #[rustfmt::skip]
    pub const fn shape(&self) -> DatasetShape { self.shape }

    /// Returns the number of rows.
    #[must_use]
    #[rustfmt::skip]
    pub const fn rows(&self) -> usize { self.shape.rows }

    /// Returns the number of feature columns.
    #[must_use]
    #[rustfmt::skip]
    pub const fn cols(&self) -> usize { self.shape.cols }

    /// Returns the number of classes.
    #[must_use]
    #[rustfmt::skip]
    pub const fn classes(&self) -> usize { self.shape.classes }

    /// Returns the row-major feature matrix.
    #[must_use]
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    /// Returns the per-row labels.
    #[must_use]
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Returns the features of row `index`, or `None` past the end.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.shape.cols)?;
        let end = start.checked_add(self.shape.cols)?;
        self.features.get(start..end)
    }

    /// Counts how many rows carry each label.
    ///
    /// # Examples
    /// ```
    /// use tabbench_core::{DatasetShape, HostDataset};
    ///
    /// let dataset = HostDataset::new(
    ///     DatasetShape::new(3, 1, 2),
    ///     vec![0.0, 1.0, 2.0],
    ///     vec![1, 0, 1],
    /// )?;
    /// assert_eq!(dataset.class_counts(), vec![1, 2]);
    /// # Ok::<(), tabbench_core::ShapeError>(())
    /// ```
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        count_labels(&self.labels, self.shape.classes)
    }

    /// Splits the dataset into its shape, features and labels.
    #[must_use]
    pub fn into_parts(self) -> (DatasetShape, Vec<f32>, Vec<i32>) {
        (self.shape, self.features, self.labels)
    }
}

pub(crate) fn label_in_range(label: i32, classes: usize) -> bool {
    usize::try_from(label).is_ok_and(|value| value < classes)
}

/// Tallies `labels` into `classes` buckets, skipping out-of-range labels.
pub(crate) fn count_labels(labels: &[i32], classes: usize) -> Vec<usize> {
    let mut counts = vec![0_usize; classes];
    for label in labels {
        if let Ok(index) = usize::try_from(*label)
            && let Some(count) = counts.get_mut(index)
        {
            *count = count.saturating_add(1);
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn rejects_short_feature_matrix() {
        let err = HostDataset::new(DatasetShape::new(2, 3, 1), vec![0.0; 5], vec![0, 0])
            .expect_err("short matrix must fail");
        assert_eq!(
            err,
            ShapeError::FeatureLengthMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[rstest]
    fn rejects_label_length_mismatch() {
        let err = HostDataset::new(DatasetShape::new(2, 1, 1), vec![0.0; 2], vec![0])
            .expect_err("missing label must fail");
        assert_eq!(
            err,
            ShapeError::LabelLengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[rstest]
    #[case::negative(-1)]
    #[case::equal_to_classes(3)]
    fn rejects_out_of_range_labels(#[case] label: i32) {
        let err = HostDataset::new(DatasetShape::new(2, 1, 3), vec![0.0; 2], vec![0, label])
            .expect_err("label outside [0, classes) must fail");
        assert_eq!(
            err,
            ShapeError::LabelOutOfRange {
                row: 1,
                label,
                classes: 3
            }
        );
    }

    #[rstest]
    fn feature_len_reports_overflow() {
        let shape = DatasetShape::new(usize::MAX, 2, 1);
        assert!(matches!(
            shape.feature_len(),
            Err(ShapeError::Overflow { .. })
        ));
    }

    #[rstest]
    fn row_returns_none_past_the_end() {
        let dataset = HostDataset::new(DatasetShape::new(2, 2, 1), vec![1.0; 4], vec![0, 0])
            .expect("valid dataset");
        assert!(dataset.row(1).is_some());
        assert!(dataset.row(2).is_none());
    }

    #[rstest]
    fn into_parts_returns_the_buffers() {
        let dataset = HostDataset::new(
            DatasetShape::new(1, 2, 1),
            vec![0.5, 1.5],
            vec![0],
        )
        .expect("valid dataset");
        let (shape, features, labels) = dataset.into_parts();
        assert_eq!(shape, DatasetShape::new(1, 2, 1));
        assert_eq!(features, vec![0.5, 1.5]);
        assert_eq!(labels, vec![0]);
    }
}
