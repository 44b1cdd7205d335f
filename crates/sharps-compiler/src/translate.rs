//! The translate pass and program assembly.

use rustc_hash::FxHashSet;
use sharps_common::{SharpError, SharpResult, limits};
use sharps_expr::{Expr, ExprArena, ExprId, ExprProgram, Printer, PropertyKind};
use sharps_scanner::chars;
use tracing::debug;

/// A deferred patch: once every labeled literal exists in the table,
/// `$S[container].key = $S[source]` restores the reference the
/// placeholder stood in for.
#[derive(Debug)]
struct Fixup {
    container: u32,
    /// Whether `container` is a real sharp label or a synthetic id that
    /// still needs the renumbering offset.
    container_is_sharp: bool,
    key: FixupKey,
    source: u32,
}

#[derive(Debug)]
enum FixupKey {
    /// Array element position.
    Index(u32),
    /// Object property name.
    Name(String),
}

/// Compile a parsed single-expression program into construction code.
pub fn compile(program: &mut ExprProgram) -> SharpResult<String> {
    let mut compiler = Compiler::new(&mut program.arena);
    let root = compiler.translate(program.root, None)?;

    if compiler.sharp_labels.is_empty() {
        // No labels anywhere: the rewrite is the identity and the
        // original text is already the simplest correct output.
        return Ok(program.source.clone());
    }

    // Synthetic ids must not collide with any sharp label inside the one
    // shared table; offset them past the highest label.
    let offset = compiler.max_label + 1;
    for &(node, synthetic) in &compiler.synthetic_index_nodes {
        if let Some(Expr::Number { text }) = compiler.arena.get_mut(node) {
            *text = (synthetic + offset).to_string();
        }
    }

    debug!(
        labels = compiler.sharp_labels.len(),
        fixups = compiler.fixups.len(),
        synthetics = compiler.synthetic_index_nodes.len(),
        "compiled sharp expression"
    );

    let expr = compiler.assemble(root, offset);
    let rendered = Printer::new(compiler.arena).print(expr);
    Ok(format!("(function($S){{return {rendered};}}([]))"))
}

struct Compiler<'a> {
    arena: &'a mut ExprArena,
    /// Labels with an open-or-complete definition.
    sharp_labels: FxHashSet<u32>,
    max_label: u32,
    next_synthetic: u32,
    /// Number nodes holding synthetic ids, rewritten once the label count
    /// is known.
    synthetic_index_nodes: Vec<(ExprId, u32)>,
    fixups: Vec<Fixup>,
    depth: u32,
}

impl<'a> Compiler<'a> {
    fn new(arena: &'a mut ExprArena) -> Compiler<'a> {
        Compiler {
            arena,
            sharp_labels: FxHashSet::default(),
            max_label: 0,
            next_synthetic: 0,
            synthetic_index_nodes: Vec::new(),
            fixups: Vec::new(),
            depth: 0,
        }
    }

    // =========================================================================
    // Node constructors
    // =========================================================================

    fn table(&mut self) -> ExprId {
        self.arena.alloc(Expr::Identifier {
            name: "$S".to_string(),
        })
    }

    fn number(&mut self, value: u32) -> ExprId {
        self.arena.alloc(Expr::Number {
            text: value.to_string(),
        })
    }

    /// `$S[index]`
    fn table_slot(&mut self, index: u32) -> ExprId {
        let table = self.table();
        let index = self.number(index);
        self.arena.alloc(Expr::Index {
            object: table,
            index,
        })
    }

    fn assign(&mut self, target: ExprId, value: ExprId) -> ExprId {
        self.arena.alloc(Expr::Assign { target, value })
    }

    // =========================================================================
    // Translate pass
    // =========================================================================

    /// Rewrite the subtree at `id` and return its replacement root.
    /// `sharp_label` is set when `id` is the body of a sharp definition,
    /// in which case the definition's own `$S[n] =` wrapper addresses it
    /// and no synthetic id is needed.
    fn translate(&mut self, id: ExprId, sharp_label: Option<u32>) -> SharpResult<ExprId> {
        if self.depth >= limits::MAX_NESTING_DEPTH {
            return Err(SharpError::grammar(0, "nesting too deep"));
        }
        self.depth += 1;
        let result = self.translate_inner(id, sharp_label);
        self.depth -= 1;
        result
    }

    fn translate_inner(&mut self, id: ExprId, sharp_label: Option<u32>) -> SharpResult<ExprId> {
        let expr = self
            .arena
            .get(id)
            .ok_or_else(|| SharpError::internal("invalid handle during compilation"))?;
        match expr {
            Expr::ObjectLit { properties } => {
                let len = properties.len();
                self.translate_object(id, len, sharp_label)
            }
            Expr::ArrayLit { elements } => {
                let len = elements.len();
                self.translate_array(id, len, sharp_label)
            }
            Expr::SharpDef { label, body } => {
                let (label, body) = (*label, *body);
                self.translate_sharp_def(label, body)
            }
            Expr::SharpRef { label } => {
                Err(SharpError::UnsupportedReferencePosition { label: *label })
            }
            Expr::Paren { expression } => {
                let child = *expression;
                let new_child = self.translate(child, None)?;
                if new_child != child
                    && let Some(Expr::Paren { expression }) = self.arena.get_mut(id)
                {
                    *expression = new_child;
                }
                Ok(id)
            }
            Expr::Call { callee, arguments } | Expr::New { callee, arguments } => {
                let callee = *callee;
                let arguments = arguments.clone();
                let new_callee = self.translate(callee, None)?;
                let mut new_arguments = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    new_arguments.push(self.translate(argument, None)?);
                }
                match self.arena.get_mut(id) {
                    Some(Expr::Call { callee, arguments } | Expr::New { callee, arguments }) => {
                        *callee = new_callee;
                        *arguments = new_arguments;
                    }
                    _ => {}
                }
                Ok(id)
            }
            Expr::Assign { target, value } => {
                let (target, value) = (*target, *value);
                let new_target = self.translate(target, None)?;
                let new_value = self.translate(value, None)?;
                if let Some(Expr::Assign { target, value }) = self.arena.get_mut(id) {
                    *target = new_target;
                    *value = new_value;
                }
                Ok(id)
            }
            Expr::Comma { expressions } => {
                let expressions = expressions.clone();
                let mut new_expressions = Vec::with_capacity(expressions.len());
                for expression in expressions {
                    new_expressions.push(self.translate(expression, None)?);
                }
                if let Some(Expr::Comma { expressions }) = self.arena.get_mut(id) {
                    *expressions = new_expressions;
                }
                Ok(id)
            }
            Expr::Unary { operand, .. } => {
                let operand = *operand;
                let new_operand = self.translate(operand, None)?;
                if new_operand != operand
                    && let Some(Expr::Unary { operand, .. }) = self.arena.get_mut(id)
                {
                    *operand = new_operand;
                }
                Ok(id)
            }
            Expr::Index { object, index } => {
                let (object, index) = (*object, *index);
                let new_object = self.translate(object, None)?;
                let new_index = self.translate(index, None)?;
                if let Some(Expr::Index { object, index }) = self.arena.get_mut(id) {
                    *object = new_object;
                    *index = new_index;
                }
                Ok(id)
            }
            Expr::Member { object, .. } => {
                let object = *object;
                let new_object = self.translate(object, None)?;
                if new_object != object
                    && let Some(Expr::Member { object, .. }) = self.arena.get_mut(id)
                {
                    *object = new_object;
                }
                Ok(id)
            }
            // Leaves, including opaque function and regexp literals.
            Expr::Number { .. }
            | Expr::String { .. }
            | Expr::Bool { .. }
            | Expr::Null
            | Expr::Identifier { .. }
            | Expr::Function { .. }
            | Expr::Regex { .. } => Ok(id),
        }
    }

    fn translate_object(
        &mut self,
        id: ExprId,
        len: usize,
        sharp_label: Option<u32>,
    ) -> SharpResult<ExprId> {
        let container_is_sharp = sharp_label.is_some();
        let mut container = sharp_label;

        for j in 0..len {
            let (value_id, is_init, key_name) = {
                let Some(Expr::ObjectLit { properties }) = self.arena.get(id) else {
                    return Err(SharpError::internal("object literal changed shape"));
                };
                let property = &properties[j];
                (
                    property.value,
                    property.kind == PropertyKind::Init,
                    property.key.name().to_string(),
                )
            };

            let ref_label = match self.arena.get(value_id) {
                Some(Expr::SharpRef { label }) => Some(*label),
                _ => None,
            };

            if is_init && let Some(source) = ref_label {
                if !self.sharp_labels.contains(&source) {
                    return Err(SharpError::UndefinedLabel { label: source });
                }
                let container_id = self.container_id(&mut container);
                self.fixups.push(Fixup {
                    container: container_id,
                    container_is_sharp,
                    key: FixupKey::Name(key_name),
                    source,
                });
                self.arena.replace(
                    value_id,
                    Expr::Number {
                        text: "0".to_string(),
                    },
                );
            } else {
                let new_value = self.translate(value_id, None)?;
                if new_value != value_id
                    && let Some(Expr::ObjectLit { properties }) = self.arena.get_mut(id)
                {
                    properties[j].value = new_value;
                }
            }
        }

        self.finish_container(id, container, container_is_sharp)
    }

    fn translate_array(
        &mut self,
        id: ExprId,
        len: usize,
        sharp_label: Option<u32>,
    ) -> SharpResult<ExprId> {
        let container_is_sharp = sharp_label.is_some();
        let mut container = sharp_label;

        for j in 0..len {
            let element = {
                let Some(Expr::ArrayLit { elements }) = self.arena.get(id) else {
                    return Err(SharpError::internal("array literal changed shape"));
                };
                elements[j]
            };
            let Some(value_id) = element else {
                continue; // hole
            };

            let ref_label = match self.arena.get(value_id) {
                Some(Expr::SharpRef { label }) => Some(*label),
                _ => None,
            };

            if let Some(source) = ref_label {
                if !self.sharp_labels.contains(&source) {
                    return Err(SharpError::UndefinedLabel { label: source });
                }
                let container_id = self.container_id(&mut container);
                self.fixups.push(Fixup {
                    container: container_id,
                    container_is_sharp,
                    key: FixupKey::Index(j as u32),
                    source,
                });
                self.arena.replace(
                    value_id,
                    Expr::Number {
                        text: "0".to_string(),
                    },
                );
            } else {
                let new_value = self.translate(value_id, None)?;
                if new_value != value_id
                    && let Some(Expr::ArrayLit { elements }) = self.arena.get_mut(id)
                {
                    elements[j] = Some(new_value);
                }
            }
        }

        self.finish_container(id, container, container_is_sharp)
    }

    /// `#n=<body>` becomes `$S[n] = <rewritten body>`. The label is
    /// registered before the body is translated so a reference inside the
    /// body's own subtree resolves.
    fn translate_sharp_def(&mut self, label: u32, body: ExprId) -> SharpResult<ExprId> {
        if !self.sharp_labels.insert(label) {
            return Err(SharpError::DuplicateLabel { label });
        }
        self.max_label = self.max_label.max(label);
        let payload = self.translate(body, Some(label))?;
        let slot = self.table_slot(label);
        Ok(self.assign(slot, payload))
    }

    /// The container's id in the fixup address space, assigning a fresh
    /// synthetic id on first need.
    fn container_id(&mut self, container: &mut Option<u32>) -> u32 {
        match *container {
            Some(id) => id,
            None => {
                let id = self.next_synthetic;
                self.next_synthetic += 1;
                *container = Some(id);
                id
            }
        }
    }

    /// Wrap an unlabeled container that acquired a synthetic id in
    /// `$S[id] = <literal>` so the fixup pass can address it. The number
    /// node is recorded for renumbering.
    fn finish_container(
        &mut self,
        id: ExprId,
        container: Option<u32>,
        container_is_sharp: bool,
    ) -> SharpResult<ExprId> {
        if container_is_sharp {
            return Ok(id);
        }
        let Some(synthetic) = container else {
            return Ok(id);
        };
        let index = self.number(synthetic);
        self.synthetic_index_nodes.push((index, synthetic));
        let table = self.table();
        let target = self.arena.alloc(Expr::Index {
            object: table,
            index,
        });
        Ok(self.assign(target, id))
    }

    // =========================================================================
    // Assembly
    // =========================================================================

    /// Bundle the rewritten root with the fixup assignments:
    /// `[root][fixup1, fixup2, …, 0]`, or the root alone when there is
    /// nothing to patch.
    fn assemble(&mut self, root: ExprId, offset: u32) -> ExprId {
        let fixups = std::mem::take(&mut self.fixups);
        if fixups.is_empty() {
            return root;
        }

        let mut rest = Vec::with_capacity(fixups.len() + 1);
        for fixup in fixups {
            let container = if fixup.container_is_sharp {
                fixup.container
            } else {
                fixup.container + offset
            };
            let object = self.table_slot(container);
            let target = match fixup.key {
                FixupKey::Index(i) => {
                    let index = self.number(i);
                    self.arena.alloc(Expr::Index { object, index })
                }
                FixupKey::Name(name) if chars::is_identifier(&name) => {
                    self.arena.alloc(Expr::Member {
                        object,
                        property: name,
                    })
                }
                FixupKey::Name(name) => {
                    let index = self.arena.alloc(Expr::String { value: name });
                    self.arena.alloc(Expr::Index { object, index })
                }
            };
            let source = self.table_slot(fixup.source);
            rest.push(self.assign(target, source));
        }
        rest.push(self.number(0));

        let first = self.arena.alloc(Expr::ArrayLit {
            elements: vec![Some(root)],
        });
        let sequence = self.arena.alloc(Expr::Comma { expressions: rest });
        self.arena.alloc(Expr::Index {
            object: first,
            index: sequence,
        })
    }
}
