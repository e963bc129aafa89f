#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`PatternSet`](crate::PatternSet) from `name => expression` pairs,
/// registered in the order written.
///
/// Evaluates to `Result<PatternSet>`: the first malformed expression or
/// repeated name is returned as the error.
///
/// ```
/// let set = parley::patterns! {
///     "text" => "(Text|RawText)+ QuickRepliesList?",
///     "postback" => "Postback",
/// }
/// .unwrap();
/// assert_eq!(set.names().collect::<Vec<_>>(), ["text", "postback"]);
/// ```
#[macro_export]
macro_rules! patterns {
    ( $( $name:expr => $expr:expr ),* $(,)? ) => {{
        (|| -> $crate::Result<$crate::PatternSet> {
            #[allow(unused_mut)]
            let mut set = $crate::PatternSet::new();
            $( set.register($name, $expr)?; )*
            Ok(set)
        })()
    }};
}
