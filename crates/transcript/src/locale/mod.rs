//! Language-specific verbalizers (§4.9): numbers, currency, percentages,
//! distances, weights/volumes, and dates, for `en` and `de`.

pub mod de;
pub mod en;
