//! Structured logging and operation context

use uuid::Uuid;

/// Structured logger for protocol events, tagged with a correlation id and
/// the name of the operation that created it
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    context_id: String,
    operation: String,
}

impl StructuredLogger {
    pub fn new(context_id: String, operation: &str) -> Self {
        Self {
            context_id,
            operation: operation.to_string(),
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn log_transaction_built(
        &self,
        kind: &str,
        mint: &str,
        instructions: usize,
        size: usize,
        fee: u64,
    ) {
        tracing::info!(
            context_id = %self.context_id,
            operation = %self.operation,
            kind = %kind,
            mint = %mint,
            instructions = %instructions,
            size_bytes = %size,
            estimated_fee = %fee,
            "Unsigned transaction built"
        );
    }

    pub fn log_build_rejected(&self, kind: &str, mint: &str, error_kind: &str, error: &str) {
        tracing::warn!(
            context_id = %self.context_id,
            operation = %self.operation,
            kind = %kind,
            mint = %mint,
            error_kind = %error_kind,
            error = %error,
            "Transaction build rejected"
        );
    }

    pub fn log_dry_run_step(&self, step: &str, success: bool, fee: u64, warnings: usize) {
        tracing::info!(
            context_id = %self.context_id,
            operation = %self.operation,
            step = %step,
            success = %success,
            estimated_fee = %fee,
            warnings = %warnings,
            "Dry-run step completed"
        );
    }

    pub fn log_verification(&self, mint: &str, status: &str, confidence: &str) {
        tracing::info!(
            context_id = %self.context_id,
            operation = %self.operation,
            mint = %mint,
            status = %status,
            confidence = %confidence,
            "Verification resolved"
        );
    }
}

/// Per-call operation context; every core call builds a fresh one
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Unique request ID
    pub request_id: String,

    /// Structured logger instance
    pub logger: StructuredLogger,
}

impl OperationContext {
    pub fn new(operation: &str) -> Self {
        let request_id = Uuid::new_v4().to_string();
        Self {
            logger: StructuredLogger::new(request_id.clone(), operation),
            request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_have_unique_ids() {
        let a = OperationContext::new("verify");
        let b = OperationContext::new("verify");
        assert_ne!(a.request_id, b.request_id);
        assert_eq!(a.logger.context_id(), a.request_id);
    }

    #[test]
    fn test_logger_carries_operation() {
        let ctx = OperationContext::new("build_retire");
        assert_eq!(ctx.logger.operation(), "build_retire");
    }
}
