//! Validation helpers for clustering algorithms.

use numr::dtype::DType;

use crate::error::{ClusterError, ClusterResult};

/// Validate point set dtype (the kernels read F64 values back to the host).
pub fn validate_cluster_dtype(dtype: DType, op: &'static str) -> ClusterResult<()> {
    if dtype != DType::F64 {
        return Err(ClusterError::invalid_parameter(
            "data",
            format!("{op} requires F64 data, got {dtype:?}"),
        ));
    }
    Ok(())
}

/// Validate that data is 2D [n, d] with at least one point.
pub fn validate_data_2d(shape: &[usize], op: &'static str) -> ClusterResult<()> {
    if shape.len() != 2 {
        return Err(ClusterError::DimensionMismatch {
            expected: 2,
            got: shape.len(),
            context: format!("{op} (data rank)"),
        });
    }
    if shape[0] == 0 {
        return Err(ClusterError::EmptyDataset {
            context: op.to_string(),
        });
    }
    if shape[1] == 0 {
        return Err(ClusterError::invalid_parameter(
            "data",
            format!("{op} requires vector dimension > 0"),
        ));
    }
    Ok(())
}

/// Validate n_clusters against the number of points.
pub fn validate_n_clusters(n_clusters: usize, n_points: usize) -> ClusterResult<()> {
    if n_clusters == 0 || n_clusters > n_points {
        return Err(ClusterError::InvalidClusterCount {
            k: n_clusters,
            n: n_points,
        });
    }
    Ok(())
}

/// Validate a strictly positive, finite parameter.
pub fn validate_positive(value: f64, parameter: &str) -> ClusterResult<()> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ClusterError::invalid_parameter(
            parameter,
            format!("requires finite value > 0, got {value}"),
        ));
    }
    Ok(())
}

/// Validate a non-negative, finite tolerance.
pub fn validate_tolerance(value: f64, parameter: &str) -> ClusterResult<()> {
    if value < 0.0 || !value.is_finite() {
        return Err(ClusterError::invalid_parameter(
            parameter,
            format!("requires finite value >= 0, got {value}"),
        ));
    }
    Ok(())
}

/// Validate a fraction in `[0, 1]`.
pub fn validate_fraction(value: f64, parameter: &str) -> ClusterResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ClusterError::invalid_parameter(
            parameter,
            format!("requires value in [0, 1], got {value}"),
        ));
    }
    Ok(())
}

/// Validate a count that must be at least 1.
pub fn validate_count(value: usize, parameter: &str) -> ClusterResult<()> {
    if value == 0 {
        return Err(ClusterError::invalid_parameter(parameter, "must be > 0"));
    }
    Ok(())
}

/// Validate that two datasets share a dimension.
pub fn validate_same_dim(expected: usize, got: usize, op: &'static str) -> ClusterResult<()> {
    if expected != got {
        return Err(ClusterError::DimensionMismatch {
            expected,
            got,
            context: op.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cluster_dtype() {
        assert!(validate_cluster_dtype(DType::F64, "test").is_ok());
        assert!(validate_cluster_dtype(DType::F32, "test").is_err());
        assert!(validate_cluster_dtype(DType::I64, "test").is_err());
    }

    #[test]
    fn test_validate_data_2d() {
        assert!(validate_data_2d(&[10, 3], "test").is_ok());
        assert!(matches!(
            validate_data_2d(&[10], "test"),
            Err(ClusterError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            validate_data_2d(&[0, 3], "test"),
            Err(ClusterError::EmptyDataset { .. })
        ));
        assert!(validate_data_2d(&[4, 0], "test").is_err());
    }

    #[test]
    fn test_validate_n_clusters() {
        assert!(validate_n_clusters(3, 100).is_ok());
        assert!(validate_n_clusters(100, 100).is_ok());
        assert!(validate_n_clusters(0, 100).is_err());
        assert!(matches!(
            validate_n_clusters(101, 100),
            Err(ClusterError::InvalidClusterCount { k: 101, n: 100 })
        ));
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(0.5, "test").is_ok());
        assert!(validate_positive(0.0, "test").is_err());
        assert!(validate_positive(-1.0, "test").is_err());
        assert!(validate_positive(f64::INFINITY, "test").is_err());
        assert!(validate_positive(f64::NAN, "test").is_err());
    }

    #[test]
    fn test_validate_fraction() {
        assert!(validate_fraction(0.1, "test").is_ok());
        assert!(validate_fraction(1.5, "test").is_err());
        assert!(validate_fraction(f64::NAN, "test").is_err());
    }
}
