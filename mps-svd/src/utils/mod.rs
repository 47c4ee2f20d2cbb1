//! Dense complex matrix helpers and result validation

pub mod linalg;
pub mod validation;

pub use linalg::{
    dagger, diag, identity, leading_columns, leading_rows, matmul, max_column_norm_sqr,
    scale_in_place, tabulate,
};
pub use validation::{almost_equal, is_descending, is_unitary, reconstruct, validate_svd_result};
