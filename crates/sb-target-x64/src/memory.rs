//! Code-page memory manager.
//!
//! A page-granular bump allocator over OS-protected memory. Pages are
//! writable during emission; `make_executable` flips every page to
//! read/execute, after which no further allocation is permitted. Pages
//! are released to the OS when the manager is dropped.

use region::Protection;

/// Errors from the code-page manager.
#[derive(Debug)]
pub enum MemoryError {
    /// The OS refused an allocation or protection change.
    Os(region::Error),
    /// Allocation was attempted after `make_executable`.
    Executable,
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::Os(err) => write!(f, "OS memory error: {}", err),
            MemoryError::Executable => {
                write!(f, "Cannot allocate code memory after it was made executable")
            }
        }
    }
}

impl From<region::Error> for MemoryError {
    fn from(err: region::Error) -> Self {
        MemoryError::Os(err)
    }
}

/// One read/write (later read/execute) page run.
struct CodePage {
    allocation: region::Allocation,
    bytes_used: usize,
}

impl CodePage {
    fn new(size: usize) -> Result<Self, MemoryError> {
        let allocation = region::alloc(size, Protection::READ_WRITE)?;
        Ok(Self {
            allocation,
            bytes_used: 0,
        })
    }

    fn remaining(&self) -> usize {
        self.allocation.len() - self.bytes_used
    }

    fn allocate(&mut self, size: usize) -> Option<*mut u8> {
        if size > self.remaining() {
            return None;
        }
        let base = self.allocation.as_ptr::<u8>() as *mut u8;
        let pointer = unsafe { base.add(self.bytes_used) };
        self.bytes_used += size;
        Some(pointer)
    }
}

/// Owner of all executable memory of one VM instance.
///
/// Returned pointers are stable for the lifetime of the manager; there
/// is no compaction and no freeing of individual allocations.
pub struct CodeMemory {
    pages: Vec<CodePage>,
    page_size: usize,
    executable: bool,
}

/// Nominal page size for fresh code pages.
const PAGE_SIZE: usize = 4096;

impl CodeMemory {
    /// Create a manager with the nominal 4 KiB page size.
    pub fn new() -> Self {
        Self::with_page_size(PAGE_SIZE)
    }

    /// Create a manager with a custom page size.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            pages: Vec::new(),
            page_size,
            executable: false,
        }
    }

    /// Bump-allocate `size` bytes of writable code memory.
    ///
    /// Opens a new page when the active page cannot satisfy the
    /// request; requests larger than the page size get a page of their
    /// own size.
    pub fn allocate(&mut self, size: usize) -> Result<*mut u8, MemoryError> {
        if self.executable {
            return Err(MemoryError::Executable);
        }

        if let Some(page) = self.pages.last_mut() {
            if let Some(pointer) = page.allocate(size) {
                return Ok(pointer);
            }
        }

        let mut page = CodePage::new(size.max(self.page_size))?;
        let pointer = page
            .allocate(size)
            .expect("fresh page satisfies its sizing request");
        self.pages.push(page);
        Ok(pointer)
    }

    /// Flip every page to read/execute. Emission must be complete.
    pub fn make_executable(&mut self) -> Result<(), MemoryError> {
        for page in &self.pages {
            unsafe {
                region::protect(
                    page.allocation.as_ptr::<u8>(),
                    page.allocation.len(),
                    Protection::READ_EXECUTE,
                )?;
            }
        }
        self.executable = true;
        Ok(())
    }

    /// Whether `make_executable` has been called.
    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// Total bytes handed out.
    pub fn bytes_used(&self) -> usize {
        self.pages.iter().map(|page| page.bytes_used).sum()
    }
}

impl Default for CodeMemory {
    fn default() -> Self {
        Self::new()
    }
}
