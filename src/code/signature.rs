//! Procedure signatures

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed `package.Class.method(argtypes)` signature
///
/// The code name is the catalog key the compiled code is stored under. It
/// defaults to the class name and is overridden when the compiler front end
/// registered the code under a procedure name instead.
///
/// # Example
///
/// ```rust
/// use pl_runtime::Signature;
///
/// let sig: Signature = "com.acme.Sales.total(int, java.lang.String)".parse().unwrap();
/// assert_eq!(sig.class_name(), "com.acme.Sales");
/// assert_eq!(sig.method(), "total");
/// assert_eq!(sig.args(), ["int", "java.lang.String"]);
/// assert_eq!(sig.code_name(), "com.acme.Sales");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    class_name: String,
    method: String,
    args: Vec<String>,
    code_name: Option<String>,
}

impl Signature {
    /// Parse a signature string
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = |why: &str| Error::InvalidSignature(format!("{}: {:?}", why, text));

        let (head, args) = match text.find('(') {
            Some(open) => {
                let rest = &text[open + 1..];
                let inner = rest
                    .strip_suffix(')')
                    .ok_or_else(|| invalid("unbalanced parentheses"))?;
                (&text[..open], inner)
            }
            None => (text, ""),
        };

        let (class_name, method) = head
            .rsplit_once('.')
            .ok_or_else(|| invalid("missing class name"))?;
        let class_name = class_name.trim();
        let method = method.trim();
        if class_name.is_empty() || method.is_empty() {
            return Err(invalid("empty class or method name"));
        }
        if class_name.split('.').any(str::is_empty) {
            return Err(invalid("empty package segment"));
        }

        let args = if args.trim().is_empty() {
            Vec::new()
        } else {
            args.split(',').map(|a| a.trim().to_string()).collect()
        };
        if args.iter().any(String::is_empty) {
            return Err(invalid("empty argument type"));
        }

        Ok(Self {
            class_name: class_name.to_string(),
            method: method.to_string(),
            args,
            code_name: None,
        })
    }

    /// Set the catalog name the code is stored under
    pub fn with_code_name(mut self, name: impl Into<String>) -> Self {
        self.code_name = Some(name.into());
        self
    }

    /// Fully qualified class name
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Method name
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Argument type names
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Catalog key
    pub fn code_name(&self) -> &str {
        self.code_name.as_deref().unwrap_or(&self.class_name)
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.class_name, self.method, self.args.join(","))
    }
}
