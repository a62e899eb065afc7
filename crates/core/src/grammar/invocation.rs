//! Reconstruct a structured call from expanded template text.
//!
//! The expanded text is tokenized again and read as
//!
//! ```text
//! [call|send] <signer> <contract> <method-signature> [args..] [options..]
//! ```
//!
//! where options come from the closed set in [`CallOption`]. Parsing
//! ([`parse_invocation`]) is pure; alias resolution is a separate step
//! ([`ParsedInvocation::resolve`]) behind the [`AddressResolver`] seam.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::lexer::{Span, tokenize_spanned};
use crate::address::{ADDRESS_HEX_LEN, ADDRESS_PREFIX, AddressResolver, is_address_literal};
use crate::error::{CoreError, MalformedReason};

/// Leading verbs dropped before the fixed positions are read.
pub const LEADING_VERBS: &[&str] = &["call", "send"];

/// Prefix shared by all option flags.
pub const FLAG_PREFIX: &str = "--";

/// Options the reconstructor recognizes, keyed by their canonical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallOption {
    /// `--rpc-url`: RPC endpoint to submit through.
    RpcUrl,
    /// `--gas-limit`: gas limit for the transaction.
    GasLimit,
    /// `--gas-price`: gas price for the transaction.
    GasPrice,
    /// `--value`: native value to attach.
    Value,
}

impl CallOption {
    /// Every recognized option, in canonical order.
    pub const ALL: [CallOption; 4] = [
        CallOption::RpcUrl,
        CallOption::GasLimit,
        CallOption::GasPrice,
        CallOption::Value,
    ];

    /// Map an exact flag spelling (e.g. `--gas-limit`) to its option.
    pub fn from_flag(token: &str) -> Option<Self> {
        match token {
            "--rpc-url" => Some(CallOption::RpcUrl),
            "--gas-limit" => Some(CallOption::GasLimit),
            "--gas-price" => Some(CallOption::GasPrice),
            "--value" => Some(CallOption::Value),
            _ => None,
        }
    }

    /// The external flag spelling.
    pub fn flag(self) -> &'static str {
        match self {
            CallOption::RpcUrl => "--rpc-url",
            CallOption::GasLimit => "--gas-limit",
            CallOption::GasPrice => "--gas-price",
            CallOption::Value => "--value",
        }
    }

    /// The canonical key (as serialized).
    pub fn key(self) -> &'static str {
        match self {
            CallOption::RpcUrl => "rpcUrl",
            CallOption::GasLimit => "gasLimit",
            CallOption::GasPrice => "gasPrice",
            CallOption::Value => "value",
        }
    }
}

impl fmt::Display for CallOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An invocation read from expanded text, before alias resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInvocation {
    /// Signer (wallet) alias.
    pub signer_alias: String,
    /// Contract alias or literal address, as written.
    pub contract_reference: String,
    /// Method signature, e.g. `transfer(address,uint256)`.
    pub method_signature: String,
    /// Remaining non-option tokens, in order.
    pub positional_args: Vec<String>,
    /// Recognized options.
    pub options: BTreeMap<CallOption, String>,
}

impl ParsedInvocation {
    /// Resolve the contract reference and produce the final descriptor.
    pub fn resolve<R: AddressResolver + ?Sized>(self, resolver: &R) -> CallDescriptor {
        let resolved_address = resolver.resolve(&self.contract_reference);
        CallDescriptor {
            signer_alias: self.signer_alias,
            contract_reference: self.contract_reference,
            resolved_address,
            method_signature: self.method_signature,
            positional_args: self.positional_args,
            options: self.options,
        }
    }
}

/// A fully structured contract call, ready for the submission service.
///
/// Transient: built per invocation and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDescriptor {
    /// Signer (wallet) alias.
    pub signer_alias: String,
    /// Contract alias or literal address, as written.
    pub contract_reference: String,
    /// Contract address after alias resolution.
    pub resolved_address: String,
    /// Method signature.
    pub method_signature: String,
    /// Positional method arguments, in order.
    pub positional_args: Vec<String>,
    /// Recognized options.
    pub options: BTreeMap<CallOption, String>,
}

impl CallDescriptor {
    /// Value of a recognized option, if set.
    pub fn option(&self, option: CallOption) -> Option<&str> {
        self.options.get(&option).map(String::as_str)
    }

    /// Shorthand for the `rpcUrl` option.
    pub fn rpc_url(&self) -> Option<&str> {
        self.option(CallOption::RpcUrl)
    }

    /// Positional arguments that look like flags but are not recognized
    /// options. They are forwarded as-is; callers may want to warn.
    pub fn unrecognized_flags(&self) -> impl Iterator<Item = &str> {
        self.positional_args
            .iter()
            .map(String::as_str)
            .filter(|a| a.starts_with(FLAG_PREFIX))
    }

    /// Whether the contract reference resolved to a literal address.
    pub fn is_resolved(&self) -> bool {
        is_address_literal(&self.resolved_address)
    }

    /// Fail with [`CoreError::Validation`] unless the contract reference
    /// resolved to a literal address.
    pub fn ensure_resolved(&self) -> Result<(), CoreError> {
        if self.is_resolved() {
            return Ok(());
        }
        Err(CoreError::Validation {
            field: "contract",
            value: self.contract_reference.clone(),
            reason: format!(
                "not a known alias and not an address ({ADDRESS_PREFIX} + {ADDRESS_HEX_LEN} hex digits)"
            ),
        })
    }
}

/// Parse expanded text into a [`ParsedInvocation`].
///
/// Recognized flags consume the following token. Every other token after the
/// method signature, including unrecognized `--flags`, is kept as a
/// positional argument in order. A repeated option keeps its last value.
pub fn parse_invocation(text: &str) -> Result<ParsedInvocation, CoreError> {
    let mut toks = tokenize_spanned(text);
    if toks
        .first()
        .is_some_and(|t| LEADING_VERBS.contains(&t.text.as_str()))
    {
        toks.remove(0);
    }

    if toks.len() < 3 {
        return Err(CoreError::MalformedInvocation {
            reason: MalformedReason::TooFewTokens { found: toks.len() },
            span: Span::new(0, text.len()),
        });
    }

    let rest = toks.split_off(3);
    let mut fixed = toks.into_iter().map(|t| t.text);
    let signer_alias = fixed.next().unwrap_or_default();
    let contract_reference = fixed.next().unwrap_or_default();
    let method_signature = fixed.next().unwrap_or_default();

    let mut positional_args = Vec::new();
    let mut options = BTreeMap::new();
    let mut iter = rest.into_iter();
    while let Some(tok) = iter.next() {
        match CallOption::from_flag(&tok.text) {
            Some(option) => {
                let value = iter.next().ok_or_else(|| CoreError::MalformedInvocation {
                    reason: MalformedReason::MissingFlagValue {
                        flag: tok.text.clone(),
                    },
                    span: tok.span,
                })?;
                options.insert(option, value.text);
            }
            None => positional_args.push(tok.text),
        }
    }

    Ok(ParsedInvocation {
        signer_alias,
        contract_reference,
        method_signature,
        positional_args,
        options,
    })
}

/// Parse expanded text and resolve its contract reference.
///
/// ```
/// use callbook_core::{CallOption, reconstruct};
///
/// let resolve = |t: &str| t.to_string();
/// let call = reconstruct(
///     r#"call me usdc "transfer(address,uint256)" 0xabc 1000 --rpc-url http://x --wait"#,
///     &resolve,
/// )
/// .unwrap();
/// assert_eq!(call.positional_args, ["0xabc", "1000", "--wait"]);
/// assert_eq!(call.option(CallOption::RpcUrl), Some("http://x"));
/// ```
pub fn reconstruct<R: AddressResolver + ?Sized>(
    text: &str,
    resolver: &R,
) -> Result<CallDescriptor, CoreError> {
    Ok(parse_invocation(text)?.resolve(resolver))
}
