//! Macros shared by the API crate.

/// Implement `FromRef<AppState>` for a field of `AppState`.
///
/// ```ignore
/// impl_from_ref!(Arc<ApiConfig>, api_config);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for Arc<ApiConfig> {
///     fn from_ref(state: &AppState) -> Self {
///         state.api_config.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
