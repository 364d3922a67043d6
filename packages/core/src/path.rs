//! Virtual path type for the served namespace.

use std::fmt;

use crate::content_type::ContentType;

/// Errors related to virtual path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// A path component is not allowed.
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },
    /// The trailing segment has no `.ext` suffix.
    MissingExtension { path: String },
    /// The path string is invalid.
    InvalidPath { message: String },
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidComponent {
                component,
                position,
                message,
            } => {
                write!(
                    f,
                    "invalid path component '{}' at position {}: {}",
                    component, position, message
                )
            }
            PathError::MissingExtension { path } => {
                write!(f, "path '{}' has no file extension", path)
            }
            PathError::InvalidPath { message } => {
                write!(f, "invalid path: {}", message)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// A normalized path inside the virtual namespace.
///
/// Components are `/`-separated and never empty, `.` or `..`, so a virtual
/// path can always be joined onto a host directory without escaping it.
/// The rendered form always starts with `/` and is used verbatim as the
/// cache key and as the path sent to the Editor Host.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VirtualPath {
    pub components: Vec<String>,
}

impl VirtualPath {
    /// Parse a path string such as a URL pathname.
    ///
    /// Leading, trailing and repeated slashes are normalized away. A leading
    /// `./` (as used by bundle entries) is accepted and dropped.
    ///
    /// ```rust
    /// use stagefs_core::VirtualPath;
    ///
    /// let path = VirtualPath::parse("/leopard/Sprite1/costumes/a.svg").unwrap();
    /// assert_eq!(path.len(), 4);
    /// assert_eq!(path.extension(), Some("svg"));
    /// assert_eq!(VirtualPath::parse("./index.js").unwrap().to_string(), "/index.js");
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        let trimmed = s.strip_prefix("./").unwrap_or(s);
        let components: Vec<String> = trimmed
            .split('/')
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string())
            .collect();

        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }

        Ok(VirtualPath { components })
    }

    fn validate_component(component: &str, position: usize) -> Result<(), PathError> {
        let message = if component.is_empty() {
            "empty component"
        } else if component == "." || component == ".." {
            "relative segments are not allowed"
        } else if component.contains('\\') || component.contains('\0') {
            "invalid character"
        } else {
            return Ok(());
        };
        Err(PathError::InvalidComponent {
            component: component.to_string(),
            position,
            message: message.to_string(),
        })
    }

    /// Check if this path is empty (root path).
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }

    /// Append `other` beneath this path.
    ///
    /// ```rust
    /// use stagefs_core::vpath;
    ///
    /// let joined = vpath!("/leopard").join(&vpath!("./Cat/Cat.js"));
    /// assert_eq!(joined.to_string(), "/leopard/Cat/Cat.js");
    /// ```
    pub fn join(&self, other: &VirtualPath) -> VirtualPath {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        VirtualPath { components }
    }

    /// The trailing segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    /// Extension of the trailing segment, without the dot.
    ///
    /// Returns `None` when the trailing segment has no dot or ends in one.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext)
        }
    }

    /// Like [`extension`](Self::extension) but missing extensions are an error.
    pub fn require_extension(&self) -> Result<&str, PathError> {
        self.extension().ok_or_else(|| PathError::MissingExtension {
            path: self.to_string(),
        })
    }

    /// Content type implied by the extension.
    pub fn content_type(&self) -> Result<ContentType, PathError> {
        Ok(ContentType::for_extension(self.require_extension()?))
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.components.join("/"))
    }
}

/// Macro for creating virtual paths from literals.
///
/// ```rust
/// use stagefs_core::vpath;
///
/// let p = vpath!("/leopard/index.html");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! vpath {
    ($s:expr) => {
        $crate::VirtualPath::parse($s).expect("invalid path literal")
    };
}
