//! Overload resolver
//!
//! Picks one method among same-named candidates for a foreign argument
//! list, then converts the arguments for it:
//!
//! 1. Drop candidates whose arity cannot match; none left is an arity error
//!    naming the accepted range.
//! 2. For each strictness level from `Strict` to `ObjectProxy`, first try
//!    every candidate in its fixed-arity shape, then variadic candidates
//!    with the tail expanded. The first pass with an applicable candidate
//!    decides.
//! 3. Within that pass the lowest summed rank wins; ties go to the most
//!    specific parameter types, then to fixed arity over variadic, then to
//!    the most derived declaring class. A tie that survives all of these is
//!    `AmbiguousOverload`.
//!
//! Only the winner's arguments are materialized.

/// Pairwise parameter specificity
pub mod specificity;

use std::fmt;
use std::sync::Arc;

use polyhost_sdk::{ExpectedArity, InteropError, Value};

use crate::coerce::{self, Level};
use crate::context::HostContext;
use crate::error::{BridgeError, BridgeResult};
use crate::host::{HostArray, HostMethod, HostType, HostValue};

/// A method offered to the resolver with the superclass depth of its declarer
#[derive(Clone)]
pub struct OverloadCandidate {
    /// Candidate method
    pub method: Arc<HostMethod>,
    /// Superclass depth of the declaring class
    pub depth: usize,
}

impl fmt::Debug for OverloadCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.method, self.depth)
    }
}

/// The chosen method and its converted arguments. A variadic tail arrives
/// as one trailing array.
#[derive(Debug)]
pub struct Selection {
    /// Selected method
    pub method: Arc<HostMethod>,
    /// Converted arguments, ready to invoke
    pub arguments: Vec<HostValue>,
    /// Level of the pass that produced the selection
    pub level: Level,
    /// Sum of argument ranks
    pub rank: u32,
    /// True when varargs were spread over individual arguments
    pub expanded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Fixed,
    Expanded,
}

struct Applicable<'a> {
    candidate: &'a OverloadCandidate,
    shape: Shape,
    params: Vec<HostType>,
    level: Level,
    rank: u32,
}

/// Select among `candidates` for `args`
pub fn select(
    ctx: &Arc<HostContext>,
    name: &str,
    candidates: &[OverloadCandidate],
    args: &[Value],
) -> BridgeResult<Selection> {
    if candidates.is_empty() {
        return Err(BridgeError::Interop(InteropError::unknown(name)));
    }
    let by_arity: Vec<&OverloadCandidate> = candidates
        .iter()
        .filter(|c| c.method.accepts_arity(args.len()))
        .collect();
    if by_arity.is_empty() {
        return Err(BridgeError::Interop(arity_error(candidates, args.len())));
    }

    let mut applicable: Vec<Applicable<'_>> = Vec::new();
    for candidate in &by_arity {
        let method = &candidate.method;
        if method.params().len() == args.len() {
            let params = method.params().to_vec();
            if let Some((level, rank)) = probe_all(ctx, &params, args) {
                applicable.push(Applicable {
                    candidate,
                    shape: Shape::Fixed,
                    params,
                    level,
                    rank,
                });
            }
        }
        if method.is_varargs() {
            let params = expanded_params(method, args.len());
            if let Some((level, rank)) = probe_all(ctx, &params, args) {
                applicable.push(Applicable {
                    candidate,
                    shape: Shape::Expanded,
                    params,
                    level,
                    rank,
                });
            }
        }
    }

    for level in Level::ALL {
        for shape in [Shape::Fixed, Shape::Expanded] {
            let pass: Vec<&Applicable<'_>> = applicable
                .iter()
                .filter(|a| a.shape == shape && a.level <= level)
                .collect();
            if pass.is_empty() {
                continue;
            }
            let winner = pick(name, pass, args)?;
            return convert(ctx, name, winner, args);
        }
    }
    Err(BridgeError::Interop(no_applicable(ctx, name, &by_arity, args)))
}

/// Parameter types for a variadic call of `argc` arguments
fn expanded_params(method: &HostMethod, argc: usize) -> Vec<HostType> {
    let fixed = method.fixed_arity();
    let element = method.params()[fixed]
        .component()
        .cloned()
        .unwrap_or(HostType::Object);
    let mut params = method.params()[..fixed].to_vec();
    params.resize(argc, element);
    params
}

/// Highest level and summed rank over all arguments, `None` if any is rejected
fn probe_all(ctx: &Arc<HostContext>, params: &[HostType], args: &[Value]) -> Option<(Level, u32)> {
    let mut level = Level::Strict;
    let mut rank = 0;
    for (param, arg) in params.iter().zip(args) {
        let cost = coerce::probe(ctx, arg, param).ok()?;
        level = level.max(cost.level);
        rank += cost.rank;
    }
    Some((level, rank))
}

fn pick<'a, 'b>(
    name: &str,
    pass: Vec<&'b Applicable<'a>>,
    args: &[Value],
) -> BridgeResult<&'b Applicable<'a>> {
    let lowest = pass.iter().map(|a| a.rank).min().unwrap_or(0);
    let mut best: Vec<&Applicable<'_>> = pass.into_iter().filter(|a| a.rank == lowest).collect();

    if best.len() > 1 {
        let dominated: Vec<bool> = best
            .iter()
            .map(|a| {
                best.iter()
                    .any(|b| specificity::dominates(&b.params, &a.params))
            })
            .collect();
        best = best
            .into_iter()
            .zip(dominated)
            .filter(|(_, dominated)| !dominated)
            .map(|(a, _)| a)
            .collect();
    }
    if best.len() > 1 && best.iter().any(|a| !a.candidate.method.is_varargs()) {
        best.retain(|a| !a.candidate.method.is_varargs());
    }
    if best.len() > 1 {
        let deepest = best.iter().map(|a| a.candidate.depth).max().unwrap_or(0);
        best.retain(|a| a.candidate.depth == deepest);
    }

    match best.as_slice() {
        [winner] => Ok(*winner),
        _ => Err(BridgeError::Interop(InteropError::AmbiguousOverload {
            name: name.to_string(),
            candidates: best.iter().map(|a| a.candidate.method.signature()).collect(),
            arguments: describe_args(args),
        })),
    }
}

fn convert(
    ctx: &Arc<HostContext>,
    name: &str,
    winner: &Applicable<'_>,
    args: &[Value],
) -> BridgeResult<Selection> {
    let method = winner.candidate.method.clone();
    let arguments = match winner.shape {
        Shape::Fixed => winner
            .params
            .iter()
            .zip(args)
            .map(|(param, arg)| ctx.as_host(arg, param))
            .collect::<BridgeResult<Vec<_>>>()?,
        Shape::Expanded => {
            let fixed = method.fixed_arity();
            let mut out = Vec::with_capacity(fixed + 1);
            for (param, arg) in winner.params[..fixed].iter().zip(args) {
                out.push(ctx.as_host(arg, param)?);
            }
            let element = expanded_params(&method, fixed + 1)
                .pop()
                .unwrap_or(HostType::Object);
            let tail = args[fixed..]
                .iter()
                .map(|arg| ctx.as_host(arg, &element))
                .collect::<BridgeResult<Vec<_>>>()?;
            out.push(HostValue::Array(HostArray::new(element, tail)));
            out
        }
    };
    tracing::trace!(
        member = name,
        selected = %method.signature(),
        level = ?winner.level,
        rank = winner.rank,
        "overload selected"
    );
    Ok(Selection {
        method,
        arguments,
        level: winner.level,
        rank: winner.rank,
        expanded: winner.shape == Shape::Expanded,
    })
}

fn arity_error(candidates: &[OverloadCandidate], actual: usize) -> InteropError {
    let min = candidates
        .iter()
        .map(|c| c.method.fixed_arity())
        .min()
        .unwrap_or(0);
    let max = if candidates.iter().any(|c| c.method.is_varargs()) {
        None
    } else {
        candidates.iter().map(|c| c.method.params().len()).max()
    };
    InteropError::Arity {
        expected: ExpectedArity { min, max },
        actual,
    }
}

fn no_applicable(
    ctx: &Arc<HostContext>,
    name: &str,
    candidates: &[&OverloadCandidate],
    args: &[Value],
) -> InteropError {
    if let [only] = candidates {
        let method = &only.method;
        let expand = method.is_varargs()
            && (method.params().len() != args.len()
                || args.last().is_some_and(|last| !last.has_array_elements()));
        let params = if expand {
            expanded_params(method, args.len())
        } else {
            method.params().to_vec()
        };
        for (param, arg) in params.iter().zip(args) {
            if let Err(rejection) = coerce::probe(ctx, arg, param) {
                return rejection.into_error(param);
            }
        }
    }
    let overloads: Vec<String> = candidates.iter().map(|c| c.method.signature()).collect();
    InteropError::UnsupportedType {
        target: name.to_string(),
        reason: format!(
            "no applicable overload found (overloads: [{}], arguments: {})",
            overloads.join(", "),
            describe_args(args)
        ),
    }
}

fn describe_args(args: &[Value]) -> String {
    let parts: Vec<String> = args
        .iter()
        .map(|a| {
            format!(
                "{} ({})",
                a.display_string(),
                a.meta_name().unwrap_or_else(|| "Value".to_string())
            )
        })
        .collect();
    format!("[{}]", parts.join(", "))
}
