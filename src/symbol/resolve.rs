//! Identifier normalization and classification.
//!
//! [`ResolvedSymbol::resolve`] turns a syntactic identifier expression
//! (atom, dotted path, array access, bit or bit-range selection) plus a
//! context prefix into a canonical interned name, then classifies it
//! against the symbol table. The result is a flat record of independent
//! flags: a name declared in two roles keeps both flags set, which is
//! what makes ambiguity observable.

use thiserror::Error;

use crate::base::Tag;
use crate::node::{NodeArena, NodeRef};
use crate::symbol::SymbolView;

/// Fatal resolution failures. Undefined and ambiguous names are *not*
/// errors at this level; they are flags on [`ResolvedSymbol`] and only
/// become fatal through [`ResolvedSymbol::throw_error`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("\"{0}\" undefined")]
    Undefined(String),

    #[error("Symbol \"{0}\" is ambiguous in \"{1}\"")]
    Ambiguous(String, String),

    #[error("error in name resolution, operator {0}")]
    MalformedName(&'static str),
}

/// Classification of a resolved identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSymbol {
    is_var: bool,
    is_define: bool,
    is_array_def: bool,
    is_array: bool,
    is_parameter: bool,
    is_constant_simple: bool,
    is_constant_complex: bool,
    is_function: bool,

    resolved: Option<NodeRef>,
    name: NodeRef,
    context: Option<NodeRef>,
}

impl ResolvedSymbol {
    /// Resolves `name` in `context` and classifies the canonical name.
    ///
    /// Malformed identifier shapes inside `DOT`/`BIT` chains abort with
    /// [`ResolveError::MalformedName`]; an identifier that simply is
    /// not an identifier (e.g. an arithmetic expression under `ARRAY`)
    /// resolves to the undefined record instead.
    pub fn resolve(
        view: &dyn SymbolView,
        arena: &NodeArena,
        name: NodeRef,
        context: Option<NodeRef>,
    ) -> Result<ResolvedSymbol, ResolveError> {
        let simple = name;

        // Parameters can only be simple atoms prefixed with the context,
        // so atoms skip the normalization recursion.
        let complex = if arena.tag(name) == Tag::Atom {
            Some(arena.intern(Tag::Dot, context, Some(simple)))
        } else {
            resolve_name(view, arena, name, context)?
        };

        let mut this = ResolvedSymbol {
            is_var: false,
            is_define: false,
            is_array_def: false,
            is_array: false,
            is_parameter: false,
            is_constant_simple: false,
            is_constant_complex: false,
            is_function: false,
            resolved: None,
            name: simple,
            context,
        };

        if let Some(complex) = complex {
            this.is_var = view.is_var(complex);
            this.is_define = view.is_define(complex);
            this.is_array = view.is_variable_array(complex);
            this.is_array_def = view.is_array_define(complex);
            this.is_parameter = view.is_parameter(complex);
            this.is_function = view.is_function(complex);

            // Constants have global scope: the bare suffix may name one
            // even when the qualified form names something else.
            let mut tail = complex;
            while arena.tag(tail) == Tag::Dot {
                match arena.right(tail) {
                    Some(r) => tail = r,
                    None => break,
                }
            }
            if arena.tag(tail) == Tag::Atom {
                this.is_constant_simple = view.is_constant(tail);
            }
            if simple != complex {
                this.is_constant_simple |= view.is_constant(simple);
            }
            this.is_constant_complex = view.is_constant(complex);
        }

        this.resolved = if this.is_constant_simple { Some(simple) } else { complex };
        Ok(this)
    }

    /// Canonical resolved name; `None` when the input was not an
    /// identifier at all.
    pub fn resolved_name(&self) -> Option<NodeRef> {
        self.resolved
    }

    pub fn is_var(&self) -> bool {
        self.is_var
    }

    pub fn is_define(&self) -> bool {
        self.is_define
    }

    pub fn is_array_define(&self) -> bool {
        self.is_array_def
    }

    pub fn is_variable_array(&self) -> bool {
        self.is_array
    }

    pub fn is_parameter(&self) -> bool {
        self.is_parameter
    }

    pub fn is_function(&self) -> bool {
        self.is_function
    }

    /// True when either the simple or the qualified form names a
    /// constant.
    pub fn is_constant(&self) -> bool {
        self.is_constant_simple || self.is_constant_complex
    }

    /// No declaration matched in any role.
    pub fn is_undefined(&self) -> bool {
        !(self.is_var
            || self.is_define
            || self.is_array_def
            || self.is_array
            || self.is_parameter
            || self.is_function
            || self.is_constant())
    }

    /// More than one role matched. The two constant flags count as one
    /// role: a name whose simple and qualified forms both denote a
    /// constant is not ambiguous.
    pub fn is_ambiguous(&self) -> bool {
        let roles = [
            self.is_var,
            self.is_define,
            self.is_array_def,
            self.is_array,
            self.is_parameter,
            self.is_function,
            self.is_constant(),
        ];
        roles.iter().filter(|&&f| f).count() >= 2
    }

    pub fn is_error(&self) -> bool {
        self.is_undefined() || self.is_ambiguous()
    }

    /// Diagnostic text for an erroneous resolution.
    pub fn error_message(&self, arena: &NodeArena) -> Option<String> {
        if self.is_ambiguous() {
            let name = arena.display_name(self.name);
            let context = self
                .context
                .map(|c| arena.display_name(c))
                .unwrap_or_default();
            Some(format!("Symbol \"{name}\" is ambiguous in \"{context}\""))
        } else if self.is_undefined() {
            let shown = self.resolved.unwrap_or(self.name);
            Some(format!("\"{}\" undefined", arena.display_name(shown)))
        } else {
            None
        }
    }

    /// Raises the pending error, if any.
    pub fn throw_error(&self, arena: &NodeArena) -> Result<(), ResolveError> {
        if self.is_ambiguous() {
            let name = arena.display_name(self.name);
            let context = self
                .context
                .map(|c| arena.display_name(c))
                .unwrap_or_default();
            return Err(ResolveError::Ambiguous(name, context));
        }
        if self.is_undefined() {
            let shown = self.resolved.unwrap_or(self.name);
            return Err(ResolveError::Undefined(arena.display_name(shown)));
        }
        Ok(())
    }
}

/// Normalizes an identifier expression: merges the context into the
/// name, interns every step, and expands module parameters found on
/// `DOT`/`ARRAY` bases. Returns `None` for expressions that are not
/// identifiers.
fn resolve_name(
    view: &dyn SymbolView,
    arena: &NodeArena,
    name: NodeRef,
    context: Option<NodeRef>,
) -> Result<Option<NodeRef>, ResolveError> {
    match arena.tag(name) {
        Tag::Context => {
            let inner_ctx = arena.left(name);
            match arena.right(name) {
                Some(body) => resolve_name(view, arena, body, inner_ctx),
                None => Ok(None),
            }
        }

        Tag::Atom => Ok(Some(arena.intern(Tag::Dot, context, Some(name)))),

        Tag::Number => Ok(Some(name)),

        Tag::Bit => {
            let base = arena
                .left(name)
                .map(|b| resolve_name(view, arena, b, context))
                .transpose()?
                .flatten()
                .ok_or(ResolveError::MalformedName("bit"))?;
            Ok(Some(arena.intern(Tag::Bit, Some(base), arena.right(name))))
        }

        Tag::Dot => {
            let base = match arena.left(name) {
                Some(lhs) => {
                    let mut base = resolve_name(view, arena, lhs, context)?
                        .ok_or(ResolveError::MalformedName("."))?;
                    base = expand_parameter(view, arena, base)?
                        .ok_or(ResolveError::MalformedName("."))?;
                    Some(base)
                }
                None => None,
            };
            // only an atom may stand on the right of a DOT
            match arena.right(name) {
                Some(rhs) if arena.tag(rhs) == Tag::Atom => {
                    Ok(Some(arena.intern(Tag::Dot, base, Some(rhs))))
                }
                _ => Err(ResolveError::MalformedName(".")),
            }
        }

        Tag::Array => {
            let base = match arena.left(name) {
                Some(lhs) => match resolve_name(view, arena, lhs, context)? {
                    Some(b) => expand_parameter(view, arena, b)?,
                    // the whole ARRAY is an expression, not an identifier
                    None => return Ok(None),
                },
                None => None,
            };
            let Some(base) = base else { return Ok(None) };

            let index = match arena.right(name) {
                Some(idx) => Some(normalize_index(arena, idx)),
                None => None,
            };
            Ok(Some(arena.intern(Tag::Array, Some(base), index)))
        }

        Tag::BitSelection => {
            let Some(base) = arena
                .left(name)
                .map(|b| resolve_name(view, arena, b, context))
                .transpose()?
                .flatten()
            else {
                return Ok(None);
            };
            let Some(colon) = arena.right(name) else { return Ok(None) };
            let hi = match arena.left(colon) {
                Some(h) => match resolve_name(view, arena, h, context)? {
                    Some(h) => h,
                    None => return Ok(None),
                },
                None => return Ok(None),
            };
            let lo = match arena.right(colon) {
                Some(l) => match resolve_name(view, arena, l, context)? {
                    Some(l) => l,
                    None => return Ok(None),
                },
                None => return Ok(None),
            };
            let range = arena.intern(Tag::Colon, Some(hi), Some(lo));
            Ok(Some(arena.intern(Tag::BitSelection, Some(base), Some(range))))
        }

        Tag::SelfId => Ok(context),

        _ => Ok(None),
    }
}

/// Expands a module parameter to its (flattened) actual argument,
/// repeatedly, so modules passed as parameters resolve through.
fn expand_parameter(
    view: &dyn SymbolView,
    arena: &NodeArena,
    mut name: NodeRef,
) -> Result<Option<NodeRef>, ResolveError> {
    while view.is_parameter(name) {
        let Some(actual) = view.flatten_actual_parameter(name) else {
            return Ok(None);
        };
        match resolve_name(view, arena, actual, None)? {
            Some(n) => name = n,
            None => return Ok(None),
        }
    }
    Ok(Some(name))
}

/// Array indices that are integer literals (possibly negated) are
/// normalized to interned numbers; other index expressions are kept
/// verbatim.
fn normalize_index(arena: &NodeArena, index: NodeRef) -> NodeRef {
    match arena.tag(index) {
        Tag::Number => index,
        Tag::UMinus => match arena.left(index) {
            Some(inner) if arena.tag(inner) == Tag::Number => {
                match arena.int_value(inner) {
                    Some(v) => arena.int(-v),
                    None => index,
                }
            }
            _ => index,
        },
        _ => index,
    }
}
