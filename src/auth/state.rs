//! State trait wiring for the authorization extractors.

use crate::jwt::TokenCodec;

/// Trait for router state types that can verify access tokens.
///
/// The extractors in [`crate::auth::extractors`] only need the token
/// codec. They deliberately take no database handle: a request carrying
/// a valid access token is authenticated without any storage round trip.
pub trait HasTokenCodec {
    fn codec(&self) -> &TokenCodec;
}

/// Macro to implement `HasTokenCodec` for state structs with the
/// standard field.
///
/// The struct must have this field:
/// - `codec: Arc<TokenCodec>`
///
/// # Example
/// ```ignore
/// use crate::impl_has_token_codec;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub codec: Arc<TokenCodec>,
///     // ... other fields
/// }
///
/// impl_has_token_codec!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_token_codec {
    ($state_type:ty) => {
        impl $crate::auth::HasTokenCodec for $state_type {
            fn codec(&self) -> &$crate::jwt::TokenCodec {
                &self.codec
            }
        }
    };
}
