//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::cache::{GridExtent, ImageCache};
pub use crate::cache::populate::{populate, PopulateReport};
pub use crate::cache::sample::sample_into;

pub use crate::error::{CacheError, FieldError, FieldOptionError, KernelError};

pub use crate::field::notify::{ChangeBus, FieldTag, StaleFlag, Subscription};
pub use crate::field::ops::{
    BvcDecompField, BvcResult, ChanVeseField, ColorSegmentField, FirstOrderStatisticsField,
    GaussianFilterField, HaarReconstructField, HistogramEqualizeField, HistogramNormalizeField,
    HistogramThresholdField, ImageApproximationField, ImageCorrelationField, ImageOperator,
    ImageResampleField, ResampleMode,
};
pub use crate::field::{
    ImageFieldCore, ImageFieldOptions, MeshLocator, NativeResolution, SourceField,
};
