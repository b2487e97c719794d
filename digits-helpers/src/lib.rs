use ndarray::{NdFloat, ScalarOperand};
use num_traits::{FromPrimitive, NumCast, Signed};

use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

mod common;
mod distance;

pub use common::{group_by_label, DataPoint};
pub use distance::{Distance, L2Dist};

/// Numeric bound shared by every classifier crate in the workspace.
pub trait Float:
    NdFloat
    + FromPrimitive
    + Default
    + Signed
    + Sum
    + for<'a> AddAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> DivAssign<&'a Self>
    + ScalarOperand
{
    fn cast<T: NumCast>(x: T) -> Option<Self> {
        NumCast::from(x)
    }
}

impl Float for f32 {}

impl Float for f64 {}
