/// Builds `Some(vec![ContentPart::text(..)])`, the contents of a plain text send.
///
/// ```rust
/// use nexus::{ContentPart, nx_text};
///
/// let contents = nx_text!("hello");
/// assert_eq!(contents, Some(vec![ContentPart::text("hello")]));
/// ```
#[macro_export]
macro_rules! nx_text {
    ($text:expr $(,)?) => {
        Some(vec![$crate::ContentPart::text($text)])
    };
}

/// Builds send contents from `text => ..` and `image => (url, width, height)` entries.
///
/// ```rust
/// use nexus::nx_contents;
///
/// let contents = nx_contents![
///     text => "What is in this picture?",
///     image => ("https://img.test/a.png", 1024, 768),
/// ];
///
/// assert_eq!(contents.map(|parts| parts.len()), Some(2));
/// ```
#[macro_export]
macro_rules! nx_contents {
    (@part text => $text:expr) => {
        $crate::ContentPart::text($text)
    };
    (@part image => ($url:expr, $width:expr, $height:expr)) => {
        $crate::ContentPart::image($crate::ImageContent::new($url, $width, $height))
    };
    (@part $kind:ident => $($rest:tt)*) => {
        compile_error!("unsupported content kind: use text or image")
    };
    () => {
        None::<Vec<$crate::ContentPart>>
    };
    ($($kind:ident => $value:tt),+ $(,)?) => {
        Some(vec![$($crate::nx_contents!(@part $kind => $value)),+])
    };
}
