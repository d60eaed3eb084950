//! Generic contract call description.

use alloy::dyn_abi::{DynSolValue, JsonAbiExt, Specifier};
use alloy::json_abi::Function;
use alloy::primitives::{Address, Bytes, U256};

use crate::error::{WalletError, WalletResult};

/// A call to `method` on `to`. `method` is a human-readable signature such as
/// `transfer(address,uint256)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractCall {
    pub to: Address,
    pub method: String,
    pub args: Vec<DynSolValue>,
}

impl ContractCall {
    pub fn new(to: Address, method: impl Into<String>, args: Vec<DynSolValue>) -> Self {
        Self {
            to,
            method: method.into(),
            args,
        }
    }

    /// Build a call from string arguments, coercing each to its parameter type.
    pub fn from_strings(to: Address, method: &str, raw_args: &[String]) -> WalletResult<Self> {
        let function = parse_function(method)?;
        if function.inputs.len() != raw_args.len() {
            return Err(arity_error(&function, raw_args.len()));
        }
        let args = function
            .inputs
            .iter()
            .zip(raw_args)
            .map(|(param, raw)| {
                let ty = param.resolve().map_err(|e| {
                    WalletError::Validation(format!("unsupported parameter type '{}': {}", param.ty, e))
                })?;
                ty.coerce_str(raw).map_err(|e| {
                    WalletError::Validation(format!("argument '{}' is not a valid {}: {}", raw, param.ty, e))
                })
            })
            .collect::<WalletResult<Vec<_>>>()?;
        Ok(Self::new(to, method, args))
    }

    /// ABI-encoded calldata: selector followed by the arguments.
    pub fn encode(&self) -> WalletResult<Bytes> {
        let function = parse_function(&self.method)?;
        if function.inputs.len() != self.args.len() {
            return Err(arity_error(&function, self.args.len()));
        }
        function
            .abi_encode_input(&self.args)
            .map(Bytes::from)
            .map_err(|e| WalletError::Validation(format!("cannot encode call to {}: {}", self.method, e)))
    }
}

fn parse_function(method: &str) -> WalletResult<Function> {
    Function::parse(method)
        .map_err(|e| WalletError::Validation(format!("invalid method signature '{}': {}", method, e)))
}

fn arity_error(function: &Function, given: usize) -> WalletError {
    WalletError::Validation(format!(
        "{} expects {} argument(s), got {}",
        function.name,
        function.inputs.len(),
        given
    ))
}

/// Caller overrides for one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub gas_limit: Option<u64>,
    /// Gas price in wei.
    pub gas_price: Option<u128>,
    pub value: U256,
}
