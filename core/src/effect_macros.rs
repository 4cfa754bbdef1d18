//! Declarative macros for case paths and effect construction
//!
//! These macros reduce the boilerplate of embedding child features: one
//! accessor per embedded enum case, and effects built from async blocks.

/// Build a [`CasePath`](crate::case_path::CasePath) for a single-field tuple variant
///
/// # Example
///
/// ```rust
/// use composable_core::case_path;
///
/// #[derive(Debug, PartialEq)]
/// enum AppAction {
///     Tab1(i32),
///     Tab2(i32),
/// }
///
/// let tab1 = case_path!(AppAction::Tab1);
/// assert_eq!(tab1.extract(AppAction::Tab1(1)), Some(1));
/// assert_eq!(tab1.extract(AppAction::Tab2(1)), None);
/// ```
#[macro_export]
macro_rules! case_path {
    ($enum:ident :: $variant:ident) => {
        $crate::case_path::CasePath::new(
            ::std::stringify!($variant),
            |root: $enum| match root {
                $enum::$variant(value) => ::std::option::Option::Some(value),
                #[allow(unreachable_patterns)]
                _ => ::std::option::Option::None,
            },
            $enum::$variant,
        )
    };
}

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use composable_core::async_effect;
///
/// async_effect! {
///     let fact = client.fetch(count).await.ok()?;
///     Some(CounterAction::FactResponse(fact))
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Run` from an async block that sends through `$send`
///
/// # Example
///
/// ```rust,ignore
/// use composable_core::run_effect;
///
/// run_effect!(send => {
///     loop {
///         clock.sleep(Duration::from_secs(1)).await;
///         send.send(CounterAction::TimerTick).await;
///     }
/// })
/// ```
#[macro_export]
macro_rules! run_effect {
    ($send:ident => $body:block) => {
        $crate::effect::Effect::run(move |$send| async move $body)
    };
}
