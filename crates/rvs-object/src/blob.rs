use bstr::BString;

/// Raw file contents, byte-identical to the working file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub data: BString,
}

impl Blob {
    pub fn from_bytes(data: impl Into<BString>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
