// Tue Jan 13 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::memory::DEFAULT_WINDOW_SIZE;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Target machine. Decides pointer width and small-object alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    X86,
    #[default]
    Amd64,
    Arm,
    Arm64,
}

const AMD64_REGISTERS: [&str; 17] = [
    "rax", "rcx", "rdx", "rbx", "rsp", "rbp", "rsi", "rdi", "r8", "r9", "r10", "r11", "r12", "r13",
    "r14", "r15", "rip",
];
const X86_REGISTERS: [&str; 9] = ["eax", "ecx", "edx", "ebx", "esp", "ebp", "esi", "edi", "eip"];
const ARM_REGISTERS: [&str; 16] = [
    "r0", "r1", "r2", "r3", "r4", "r5", "r6", "r7", "r8", "r9", "r10", "r11", "r12", "sp", "lr", "pc",
];
const ARM64_REGISTERS: [&str; 34] = [
    "x0", "x1", "x2", "x3", "x4", "x5", "x6", "x7", "x8", "x9", "x10", "x11", "x12", "x13", "x14",
    "x15", "x16", "x17", "x18", "x19", "x20", "x21", "x22", "x23", "x24", "x25", "x26", "x27", "x28",
    "fp", "lr", "sp", "pc", "cpsr",
];

impl Architecture {
    pub fn pointer_size(&self) -> usize {
        match self {
            Architecture::X86 | Architecture::Arm => 4,
            Architecture::Amd64 | Architecture::Arm64 => 8,
        }
    }

    /// Small-object alignment; objects are pointer aligned.
    pub fn object_alignment(&self) -> u64 {
        self.pointer_size() as u64
    }

    pub fn register_name(&self, index: usize) -> Option<&'static str> {
        match self {
            Architecture::X86 => X86_REGISTERS.get(index).copied(),
            Architecture::Amd64 => AMD64_REGISTERS.get(index).copied(),
            Architecture::Arm => ARM_REGISTERS.get(index).copied(),
            Architecture::Arm64 => ARM64_REGISTERS.get(index).copied(),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Architecture::X86 => "x86",
            Architecture::Amd64 => "amd64",
            Architecture::Arm => "arm",
            Architecture::Arm64 => "arm64",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    pub architecture: Architecture,
    pub page_cache_size: usize,
    pub large_object_alignment: u64,
    pub check_cards: bool,
    pub check_background_marks: bool,
    pub max_diagnostics: usize,
    pub string_prefix_length: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            architecture: Architecture::Amd64,
            page_cache_size: DEFAULT_WINDOW_SIZE,
            large_object_alignment: 8,
            check_cards: true,
            check_background_marks: true,
            max_diagnostics: 1000,
            string_prefix_length: 64,
        }
    }
}

impl HeapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_large_object_alignment(mut self, alignment: u64) -> Self {
        self.large_object_alignment = alignment;
        self
    }

    pub fn with_page_cache_size(mut self, size: usize) -> Self {
        self.page_cache_size = size;
        self
    }

    pub fn with_card_checks(mut self, enabled: bool) -> Self {
        self.check_cards = enabled;
        self
    }

    pub fn pointer_size(&self) -> usize {
        self.architecture.pointer_size()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.large_object_alignment.is_power_of_two() {
            return Err("large_object_alignment must be a power of two".to_string());
        }
        if self.large_object_alignment < self.architecture.object_alignment() {
            return Err("large_object_alignment must be at least the pointer size".to_string());
        }
        if self.page_cache_size < self.pointer_size() {
            return Err("page_cache_size must hold at least one pointer".to_string());
        }
        if self.string_prefix_length == 0 {
            return Err("string_prefix_length must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: HeapConfig = serde_json::from_str(&contents)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
