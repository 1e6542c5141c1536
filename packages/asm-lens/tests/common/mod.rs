#![allow(dead_code)]

use std::path::{Path, PathBuf};

use gimli::write::{
    Address, AttributeValue, DwarfUnit, EndianVec, LineProgram, LineString, Sections,
};
use gimli::{Encoding, Format, LineEncoding, LittleEndian};
use object::write::{Mangling, Object, SectionId, StandardSection, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SectionKind, SymbolFlags, SymbolKind, SymbolScope};

pub const SOURCE_NAME: &str = "main.c";

pub const SOURCE: &str = "\
#include <stdio.h>

int foo(void) {
    asm(\"nop\");
    return 0;
}

int bar(void) { return 1; }

int helper(void);
";

/// Functions in .text, in symbol-table order: (name, offset, bytes).
///
/// Everything starts at 0x10; the first 16 bytes are padding.
pub const FUNCTIONS: &[(&str, u64, &[u8])] = &[
    // push rbp; mov rbp, rsp; nop; pop rbp; ret
    ("main.foo", 0x10, &[0x55, 0x48, 0x89, 0xe5, 0x90, 0x5d, 0xc3]),
    // nop; nop; ret
    ("main.bar", 0x17, &[0x90, 0x90, 0xc3]),
    // ret
    ("helper", 0x1a, &[0xc3]),
];

/// Zero sized marker right after the last function.
pub const MARKER: (&str, u64) = ("marker", 0x1b);

/// Line rows as (address, line). The sequence ends at 0x1a, so `helper` has
/// no line information.
pub const ROWS: &[(u64, u64)] = &[(0x10, 3), (0x14, 4), (0x15, 5), (0x17, 8)];
pub const SEQUENCE_END: u64 = 0x1a;

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub exe: PathBuf,
    pub source: PathBuf,
}

/// Build a small x86-64 ELF object in a temp dir, with its source file next
/// to it and, optionally, a DWARF line program pointing at that file.
pub fn build(with_dwarf: bool) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join(SOURCE_NAME);
    std::fs::write(&source, SOURCE).expect("write source");

    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);

    let text_id = obj.add_section(Vec::new(), b".text".to_vec(), SectionKind::Text);
    let mut text = vec![0x90u8; 0x10];
    for (_, _, bytes) in FUNCTIONS {
        text.extend_from_slice(bytes);
    }
    obj.section_mut(text_id).set_data(text, 16);

    for (name, offset, bytes) in FUNCTIONS {
        obj.add_symbol(Symbol {
            name: name.as_bytes().to_vec(),
            value: *offset,
            size: bytes.len() as u64,
            kind: SymbolKind::Text,
            scope: SymbolScope::Linkage,
            weak: false,
            section: SymbolSection::Section(text_id),
            flags: SymbolFlags::None,
        });
    }
    obj.add_symbol(Symbol {
        name: MARKER.0.as_bytes().to_vec(),
        value: MARKER.1,
        size: 0,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(text_id),
        flags: SymbolFlags::None,
    });

    // A data symbol whose name also matches "^main\." must never show up
    let data_id = obj.add_section(Vec::new(), b".data".to_vec(), SectionKind::Data);
    obj.section_mut(data_id).set_data(vec![0u8; 8], 8);
    obj.add_symbol(Symbol {
        name: b"main.table".to_vec(),
        value: 0,
        size: 8,
        kind: SymbolKind::Data,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(data_id),
        flags: SymbolFlags::None,
    });

    if with_dwarf {
        add_dwarf(&mut obj, dir.path());
    }

    let exe = dir.path().join("fixture.o");
    std::fs::write(&exe, obj.write().expect("write object")).expect("write fixture");
    Fixture { dir, exe, source }
}

/// One line-program sequence: start address, end address, (address, line) rows.
pub type Sequence<'a> = (u64, u64, &'a [(u64, u64)]);

fn add_dwarf(obj: &mut Object<'_>, comp_dir: &Path) {
    add_line_program(obj, comp_dir, &[(ROWS[0].0, SEQUENCE_END, ROWS)]);
}

fn add_line_program(obj: &mut Object<'_>, comp_dir: &Path, sequences: &[Sequence<'_>]) {
    let encoding = Encoding {
        format: Format::Dwarf32,
        version: 4,
        address_size: 8,
    };
    let comp_dir = comp_dir.to_string_lossy().as_bytes().to_vec();

    let mut dwarf = DwarfUnit::new(encoding);
    let mut program = LineProgram::new(
        encoding,
        LineEncoding::default(),
        LineString::String(comp_dir.clone()),
        LineString::String(SOURCE_NAME.as_bytes().to_vec()),
        None,
    );
    let dir_id = program.default_directory();
    let file_id = program.add_file(
        LineString::String(SOURCE_NAME.as_bytes().to_vec()),
        dir_id,
        None,
    );

    for (start, end, rows) in sequences {
        program.begin_sequence(Some(Address::Constant(*start)));
        for (address, line) in rows.iter() {
            let row = program.row();
            row.address_offset = address - start;
            row.file = file_id;
            row.line = *line;
            program.generate_row();
        }
        program.end_sequence(end - start);
    }
    dwarf.unit.line_program = program;

    let low = sequences.iter().map(|s| s.0).min().unwrap_or(0);
    let high = sequences.iter().map(|s| s.1).max().unwrap_or(0);
    let root = dwarf.unit.root();
    let entry = dwarf.unit.get_mut(root);
    entry.set(
        gimli::DW_AT_name,
        AttributeValue::String(SOURCE_NAME.as_bytes().to_vec()),
    );
    entry.set(gimli::DW_AT_comp_dir, AttributeValue::String(comp_dir));
    entry.set(
        gimli::DW_AT_low_pc,
        AttributeValue::Address(Address::Constant(low)),
    );
    entry.set(gimli::DW_AT_high_pc, AttributeValue::Udata(high - low));
    entry.set(gimli::DW_AT_stmt_list, AttributeValue::LineProgramRef);

    let mut sections = Sections::new(EndianVec::new(LittleEndian));
    dwarf.write(&mut sections).expect("write dwarf");
    sections
        .for_each(|id, data| -> Result<(), ()> {
            if !data.slice().is_empty() {
                let section = obj.add_section(
                    Vec::new(),
                    id.name().as_bytes().to_vec(),
                    SectionKind::Debug,
                );
                obj.section_mut(section).set_data(data.slice().to_vec(), 1);
            }
            Ok(())
        })
        .expect("add dwarf sections");
}

fn code_symbol(name: &str, value: u64, size: u64, section: SectionId) -> Symbol {
    Symbol {
        name: name.as_bytes().to_vec(),
        value,
        size,
        kind: SymbolKind::Text,
        scope: SymbolScope::Linkage,
        weak: false,
        section: SymbolSection::Section(section),
        flags: SymbolFlags::None,
    }
}

/// x86-64 Mach-O object. Mach-O symbols carry no size, so the reader has to
/// work them out from the symbol that follows.
///
/// `_foo` is push rbp; mov rbp, rsp; pop rbp; ret and `_bar` is nop; ret.
pub fn build_macho() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join(SOURCE_NAME);
    std::fs::write(&source, SOURCE).expect("write source");

    let mut obj = Object::new(BinaryFormat::MachO, Architecture::X86_64, Endianness::Little);
    obj.set_mangling(Mangling::None);
    let text = obj.section_id(StandardSection::Text);
    obj.section_mut(text)
        .set_data(vec![0x55, 0x48, 0x89, 0xe5, 0x5d, 0xc3, 0x90, 0xc3], 16);
    obj.add_symbol(code_symbol("_foo", 0, 6, text));
    obj.add_symbol(code_symbol("_bar", 6, 2, text));

    let exe = dir.path().join("fixture-macho.o");
    std::fs::write(&exe, obj.write().expect("write object")).expect("write fixture");
    Fixture { dir, exe, source }
}

/// Relocatable ELF built as with `-ffunction-sections`: `split.foo` and
/// `split.bar` each get their own `.text.*` section, both at address 0, and
/// the unrelocated line program has a sequence at 0 for each of them.
pub fn build_split_sections() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join(SOURCE_NAME);
    std::fs::write(&source, SOURCE).expect("write source");

    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    let foo = obj.add_section(Vec::new(), b".text.foo".to_vec(), SectionKind::Text);
    obj.section_mut(foo).set_data(vec![0x90, 0x90, 0xc3], 16);
    let bar = obj.add_section(Vec::new(), b".text.bar".to_vec(), SectionKind::Text);
    obj.section_mut(bar).set_data(vec![0x90, 0xc3], 16);
    obj.add_symbol(code_symbol("split.foo", 0, 3, foo));
    obj.add_symbol(code_symbol("split.bar", 0, 2, bar));

    add_line_program(
        &mut obj,
        dir.path(),
        &[(0, 3, &[(0, 3)][..]), (0, 2, &[(0, 8)][..])],
    );

    let exe = dir.path().join("fixture-split.o");
    std::fs::write(&exe, obj.write().expect("write object")).expect("write fixture");
    Fixture { dir, exe, source }
}
