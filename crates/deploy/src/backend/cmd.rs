//! Command builders for the contract toolchain.

/// Builder for the forge invocation that dumps the L2 genesis allocations.
#[derive(Debug, Clone)]
pub struct L2GenesisCmdBuilder {
    forge_bin: String,
    script: String,
    sig: String,
    chain_id: u64,
    extra_args: Vec<String>,
}

impl L2GenesisCmdBuilder {
    /// Create a new builder for the given L2 chain.
    pub fn new(chain_id: u64) -> Self {
        Self {
            forge_bin: "forge".to_string(),
            script: "scripts/L2Genesis.s.sol:L2Genesis".to_string(),
            sig: "runWithStateDump()".to_string(),
            chain_id,
            extra_args: Vec::new(),
        }
    }

    /// Use a specific forge binary instead of the one on `PATH`.
    pub fn forge_bin(mut self, bin: impl Into<String>) -> Self {
        self.forge_bin = bin.into();
        self
    }

    /// Add extra arguments.
    pub fn extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Build the command as a vector of strings.
    pub fn build(self) -> Vec<String> {
        let mut cmd = vec![
            self.forge_bin,
            "script".to_string(),
            self.script,
            "--sig".to_string(),
            self.sig,
            "--chain-id".to_string(),
            self.chain_id.to_string(),
        ];

        cmd.extend(self.extra_args);
        cmd
    }
}

/// The deploy script shipped with the contracts package.
pub fn deploy_script_cmd() -> Vec<String> {
    vec!["bash".to_string(), "deploy.sh".to_string()]
}
