//! ELF loading for RISC-V program images.

use goblin::elf::Elf;
use goblin::elf::program_header::PT_LOAD;

use crate::mem::Memory;

/// Error type for ELF loading.
#[derive(Debug, Clone)]
pub struct ElfLoadError {
    /// Description of the error.
    pub reason: String,
}

impl std::fmt::Display for ElfLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ELF load error: {}", self.reason)
    }
}

impl std::error::Error for ElfLoadError {}

/// Load a 32-bit little-endian RISC-V ELF image into the fabric.
///
/// Copies every PT_LOAD segment and zero-fills BSS tails, then returns the
/// entry point for use as the core's `reset_addr`. The fabric's address
/// mirroring applies, so images linked high (e.g. at `0x8000_0000`) land in
/// RAM the same way they do behind a partial address decoder.
///
/// # Errors
///
/// Returns an error if the ELF is invalid or not a 32-bit little-endian
/// RISC-V executable.
pub fn load_elf(elf_bytes: &[u8], memory: &mut Memory) -> Result<u32, ElfLoadError> {
    let elf = Elf::parse(elf_bytes).map_err(|e| ElfLoadError {
        reason: format!("Failed to parse ELF: {e}"),
    })?;

    validate_elf_header(&elf)?;

    for phdr in &elf.program_headers {
        if phdr.p_type == PT_LOAD {
            load_segment(memory, elf_bytes, phdr)?;
        }
    }

    u32::try_from(elf.entry).map_err(|_| ElfLoadError {
        reason: format!("Entry point {:#x} doesn't fit in u32", elf.entry),
    })
}

/// Validate the ELF header for RISC-V 32-bit.
fn validate_elf_header(elf: &Elf) -> Result<(), ElfLoadError> {
    if elf.header.e_machine != goblin::elf::header::EM_RISCV {
        return Err(ElfLoadError {
            reason: format!(
                "Expected RISC-V ELF (machine {}), got machine type {}",
                goblin::elf::header::EM_RISCV,
                elf.header.e_machine
            ),
        });
    }

    if elf.is_64 {
        return Err(ElfLoadError {
            reason: "Expected 32-bit ELF, got 64-bit".to_string(),
        });
    }

    if !elf.little_endian {
        return Err(ElfLoadError {
            reason: "Expected little-endian ELF".to_string(),
        });
    }

    Ok(())
}

/// Copy a single program segment into the fabric.
fn load_segment(
    memory: &mut Memory,
    elf_bytes: &[u8],
    phdr: &goblin::elf::ProgramHeader,
) -> Result<(), ElfLoadError> {
    let vaddr = u32::try_from(phdr.p_vaddr).map_err(|_| ElfLoadError {
        reason: format!("Segment vaddr {:#x} doesn't fit in u32", phdr.p_vaddr),
    })?;

    let filesz = u32::try_from(phdr.p_filesz).map_err(|_| ElfLoadError {
        reason: format!("Segment filesz {} too large", phdr.p_filesz),
    })?;

    let memsz = u32::try_from(phdr.p_memsz).map_err(|_| ElfLoadError {
        reason: format!("Segment memsz {} doesn't fit in u32", phdr.p_memsz),
    })?;

    let offset = usize::try_from(phdr.p_offset).map_err(|_| ElfLoadError {
        reason: format!("Segment offset {} too large", phdr.p_offset),
    })?;

    if memsz > memory.size() {
        return Err(ElfLoadError {
            reason: format!(
                "Segment at {vaddr:#x} size {memsz} exceeds fabric size {}",
                memory.size()
            ),
        });
    }

    if filesz > 0 {
        let end = offset.saturating_add(filesz as usize);
        if end > elf_bytes.len() {
            return Err(ElfLoadError {
                reason: format!(
                    "Segment file data at offset {offset} size {filesz} exceeds ELF size {}",
                    elf_bytes.len()
                ),
            });
        }
        memory.store_bytes(vaddr, &elf_bytes[offset..end]);
    }

    // Zero-fill the BSS tail (the fabric may be reused across loads).
    if memsz > filesz {
        let zeros = vec![0u8; (memsz - filesz) as usize];
        memory.store_bytes(vaddr.wrapping_add(filesz), &zeros);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::cast_possible_truncation)]

    use super::*;

    /// Build a minimal 32-bit little-endian RISC-V executable: one PT_LOAD
    /// segment holding `code` at `vaddr`.
    fn minimal_elf(entry: u32, vaddr: u32, code: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        // e_ident
        bytes.extend_from_slice(&[0x7F, b'E', b'L', b'F', 1, 1, 1]);
        bytes.extend_from_slice(&[0u8; 9]);
        bytes.extend_from_slice(&2u16.to_le_bytes()); // e_type = EXEC
        bytes.extend_from_slice(&243u16.to_le_bytes()); // e_machine = RISC-V
        bytes.extend_from_slice(&1u32.to_le_bytes()); // e_version
        bytes.extend_from_slice(&entry.to_le_bytes()); // e_entry
        bytes.extend_from_slice(&52u32.to_le_bytes()); // e_phoff
        bytes.extend_from_slice(&0u32.to_le_bytes()); // e_shoff
        bytes.extend_from_slice(&0u32.to_le_bytes()); // e_flags
        bytes.extend_from_slice(&52u16.to_le_bytes()); // e_ehsize
        bytes.extend_from_slice(&32u16.to_le_bytes()); // e_phentsize
        bytes.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
        bytes.extend_from_slice(&40u16.to_le_bytes()); // e_shentsize
        bytes.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
        bytes.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
        // program header
        bytes.extend_from_slice(&1u32.to_le_bytes()); // p_type = PT_LOAD
        bytes.extend_from_slice(&84u32.to_le_bytes()); // p_offset
        bytes.extend_from_slice(&vaddr.to_le_bytes()); // p_vaddr
        bytes.extend_from_slice(&vaddr.to_le_bytes()); // p_paddr
        bytes.extend_from_slice(&(code.len() as u32).to_le_bytes()); // p_filesz
        bytes.extend_from_slice(&(code.len() as u32).to_le_bytes()); // p_memsz
        bytes.extend_from_slice(&5u32.to_le_bytes()); // p_flags = R+X
        bytes.extend_from_slice(&4u32.to_le_bytes()); // p_align
        // segment data
        bytes.extend_from_slice(code);
        bytes
    }

    #[test]
    fn test_load_minimal_image() {
        // addi x1, x0, 5; jal x0, 0
        let mut code = Vec::new();
        code.extend_from_slice(&0x0050_0093u32.to_le_bytes());
        code.extend_from_slice(&0x0000_006Fu32.to_le_bytes());

        let image = minimal_elf(0, 0, &code);
        let mut mem = Memory::new(0x1000);
        let entry = load_elf(&image, &mut mem).unwrap();

        assert_eq!(entry, 0);
        assert_eq!(mem.read_word(0), 0x0050_0093);
        assert_eq!(mem.read_word(4), 0x0000_006F);
    }

    #[test]
    fn test_high_linked_image_mirrors_into_ram() {
        let code = 0xDEAD_BEEFu32.to_le_bytes();
        let image = minimal_elf(0x8000_0000, 0x8000_0000, &code);
        let mut mem = Memory::new(0x1000);
        let entry = load_elf(&image, &mut mem).unwrap();

        assert_eq!(entry, 0x8000_0000);
        // Mirrored: only the low address bits reach the RAM.
        assert_eq!(mem.read_word(0), 0xDEAD_BEEF);
    }

    #[test]
    fn test_invalid_elf_bytes() {
        let mut mem = Memory::new(0x1000);
        assert!(load_elf(&[0, 1, 2, 3], &mut mem).is_err());
    }

    #[test]
    fn test_elf_load_error_display() {
        let err = ElfLoadError {
            reason: "test error".to_string(),
        };
        assert_eq!(format!("{err}"), "ELF load error: test error");
    }
}
