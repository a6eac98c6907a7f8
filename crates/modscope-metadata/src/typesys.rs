use std::collections::HashMap;

use modscope_core::{HandleKind, MetadataHandle};

use crate::image::{
    ModuleImage, MEMBER_FLAG_PUBLIC, MEMBER_FLAG_SPECIAL, TYPE_FLAG_INTERFACE, TYPE_FLAG_PUBLIC,
    TYPE_FLAG_SEALED,
};

/// A member definition resolved against the string heap.
#[derive(Debug, Clone)]
pub struct MemberInfo {
    pub handle: MetadataHandle,
    pub name: String,
    pub is_public: bool,
    /// Constructor for methods, compile-time constant for fields.
    pub is_special: bool,
}

/// A type definition with its resolved names and owned member list.
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// 1-based TypeDef row.
    pub row: u32,
    pub name: String,
    pub namespace: String,
    pub is_public: bool,
    pub is_sealed: bool,
    pub is_interface: bool,
    /// Enclosing TypeDef row for nested types.
    pub enclosing: Option<u32>,
    /// Nested TypeDef rows, in declaration order.
    pub nested: Vec<u32>,
    /// Members in table order (methods, fields, properties, events), each
    /// group in row order.
    pub members: Vec<MemberInfo>,
}

impl TypeInfo {
    pub fn handle(&self) -> MetadataHandle {
        // Rows are 1-based, so the handle is never nil.
        MetadataHandle::new(HandleKind::Type, self.row).expect("TypeDef rows are 1-based")
    }
}

/// The resolved view of a module's definition tables.
///
/// Building never fails: rows with dangling string indices, bad owner rows,
/// or unplaceable nesting are skipped and counted in [`skipped_rows`], so a
/// single corrupt definition cannot take down the whole module.
///
/// [`skipped_rows`]: TypeSystem::skipped_rows
#[derive(Debug, Default)]
pub struct TypeSystem {
    types: Vec<Option<TypeInfo>>,
    member_index: HashMap<MetadataHandle, (u32, usize)>,
    skipped: usize,
}

impl TypeSystem {
    pub fn build(image: &ModuleImage) -> Self {
        let tables = image.tables();
        let mut skipped = 0usize;

        let mut types: Vec<Option<TypeInfo>> = Vec::with_capacity(tables.types.len());
        for (i, row) in tables.types.iter().enumerate() {
            let row_no = (i + 1) as u32;
            let (name, namespace) = match (image.string(row.name), image.string(row.namespace)) {
                (Ok(n), Ok(ns)) if !n.is_empty() => (n.to_owned(), ns.to_owned()),
                _ => {
                    tracing::debug!(module = image.name(), row = row_no, "skipping TypeDef row");
                    skipped += 1;
                    types.push(None);
                    continue;
                }
            };
            let enclosing = match row.enclosing {
                0 => None,
                e if e as usize <= tables.types.len() && e != row_no => Some(e),
                _ => {
                    tracing::debug!(
                        module = image.name(),
                        row = row_no,
                        "skipping TypeDef row with bad enclosing reference"
                    );
                    skipped += 1;
                    types.push(None);
                    continue;
                }
            };
            types.push(Some(TypeInfo {
                row: row_no,
                name,
                namespace,
                is_public: row.flags & TYPE_FLAG_PUBLIC != 0,
                is_sealed: row.flags & TYPE_FLAG_SEALED != 0,
                is_interface: row.flags & TYPE_FLAG_INTERFACE != 0,
                enclosing,
                nested: Vec::new(),
                members: Vec::new(),
            }));
        }

        // Drop types whose enclosing chain does not terminate (dangling or
        // cyclic nesting); the walk below must not loop forever.
        let limit = types.len();
        for i in 0..types.len() {
            if types[i].is_none() {
                continue;
            }
            let mut current = i;
            let mut steps = 0;
            let ok = loop {
                match types[current].as_ref().and_then(|t| t.enclosing) {
                    None => break types[current].is_some(),
                    Some(parent) => {
                        steps += 1;
                        if steps > limit || types[parent as usize - 1].is_none() {
                            break false;
                        }
                        current = parent as usize - 1;
                    }
                }
            };
            if !ok {
                skipped += 1;
                types[i] = None;
            }
        }

        // Attach nested types in row order.
        for i in 0..types.len() {
            let Some(parent) = types[i].as_ref().and_then(|t| t.enclosing) else {
                continue;
            };
            let child_row = (i + 1) as u32;
            if let Some(parent_info) = types[parent as usize - 1].as_mut() {
                parent_info.nested.push(child_row);
            }
        }

        let mut sys = Self {
            types,
            member_index: HashMap::new(),
            skipped,
        };

        for kind in [
            HandleKind::Method,
            HandleKind::Field,
            HandleKind::Property,
            HandleKind::Event,
        ] {
            let Some(rows) = image.tables().member_table(kind) else {
                continue;
            };
            for (i, row) in rows.iter().enumerate() {
                let row_no = (i + 1) as u32;
                let handle = match MetadataHandle::new(kind, row_no) {
                    Some(h) => h,
                    None => continue,
                };
                let name = match image.string(row.name) {
                    Ok(n) if !n.is_empty() => n.to_owned(),
                    _ => {
                        tracing::debug!(
                            module = image.name(),
                            %handle,
                            "skipping member row with bad name"
                        );
                        sys.skipped += 1;
                        continue;
                    }
                };
                let owner = row.owner;
                let owner_slot = (owner as usize)
                    .checked_sub(1)
                    .and_then(|idx| sys.types.get_mut(idx))
                    .and_then(Option::as_mut);
                let Some(owner_info) = owner_slot else {
                    tracing::debug!(
                        module = image.name(),
                        %handle,
                        owner,
                        "skipping member row with bad owner"
                    );
                    sys.skipped += 1;
                    continue;
                };
                let member_idx = owner_info.members.len();
                owner_info.members.push(MemberInfo {
                    handle,
                    name,
                    is_public: row.flags & MEMBER_FLAG_PUBLIC != 0,
                    is_special: row.flags & MEMBER_FLAG_SPECIAL != 0,
                });
                sys.member_index.insert(handle, (owner, member_idx));
            }
        }

        sys
    }

    /// Number of definition rows skipped as corrupt during the build.
    pub fn skipped_rows(&self) -> usize {
        self.skipped
    }

    pub fn type_by_row(&self, row: u32) -> Option<&TypeInfo> {
        (row as usize)
            .checked_sub(1)
            .and_then(|idx| self.types.get(idx))
            .and_then(Option::as_ref)
    }

    /// All surviving types, in row order.
    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter().filter_map(Option::as_ref)
    }

    /// Top-level (non-nested) types, in row order.
    pub fn top_level(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types().filter(|t| t.enclosing.is_none())
    }

    /// Looks up a member definition together with its owning type.
    pub fn member(&self, handle: MetadataHandle) -> Option<(&TypeInfo, &MemberInfo)> {
        let (owner, idx) = *self.member_index.get(&handle)?;
        let owner_info = self.type_by_row(owner)?;
        Some((owner_info, owner_info.members.get(idx)?))
    }

    /// Structural resolution: does this handle name a surviving definition
    /// in this module's type system?
    pub fn contains(&self, handle: MetadataHandle) -> bool {
        match handle.kind() {
            HandleKind::Type => self.type_by_row(handle.row()).is_some(),
            _ => self.member_index.contains_key(&handle),
        }
    }
}
