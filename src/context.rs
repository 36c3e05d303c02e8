//! Per-invocation context
//!
//! Ties together what one invocation needs: the shared resolver (and through
//! it the process-wide class cache) and the invocation's own engine session.
//! The invocation itself is executed by the host; this module turns an
//! invoke frame into a resolved [`Invocation`] and the outcome back into a
//! reply frame.

use std::sync::Arc;

use crate::catalog::SqlConnection;
use crate::class_cache::{ClassCache, MemoryClass};
use crate::code::Signature;
use crate::error::Result;
use crate::messages::{InvokeError, InvokeRequest, InvokeResult};
use crate::packet::Frame;
use crate::resolver::CodeResolver;
use crate::session::Session;
use crate::types::Param;

/// A resolved procedure call, ready to run
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Main class of the procedure
    pub class: Arc<MemoryClass>,
    /// Parsed signature
    pub signature: Signature,
    /// Arguments in declaration order
    pub args: Vec<Param>,
}

/// State for one invocation
#[derive(Debug)]
pub struct InvocationContext<C> {
    resolver: Arc<CodeResolver<C>>,
    session: Session,
}

impl<C: SqlConnection> InvocationContext<C> {
    /// Create a context with its own engine session
    pub fn new(resolver: Arc<CodeResolver<C>>, session: Session) -> Self {
        Self { resolver, session }
    }

    /// Get the shared class cache
    pub fn cache(&self) -> &Arc<ClassCache> {
        self.resolver.cache()
    }

    /// Get the invocation's engine session
    pub fn session(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Parse the request signature and resolve its main class
    pub async fn prepare_invocation(&self, request: InvokeRequest) -> Result<Invocation> {
        let signature = Signature::parse(&request.signature)?;
        let class = self.resolver.resolve(&signature).await?;
        tracing::debug!(signature = %signature, version = %class.version, "Prepared invocation");
        Ok(Invocation {
            class,
            signature,
            args: request.args,
        })
    }

    /// Build the reply frame for an invocation outcome
    ///
    /// Errors are reported to the engine, not returned; only a failure to
    /// encode the reply itself is.
    pub fn reply(&self, outcome: Result<InvokeResult>) -> Result<Frame> {
        match outcome {
            Ok(result) => result.to_frame(),
            Err(e) => {
                tracing::warn!(error = %e, "Invocation failed");
                InvokeError::from_error(&e).to_frame()
            }
        }
    }

    /// Close the session and release the context
    pub async fn finish(mut self) -> Result<()> {
        self.session.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CodeRepository;
    use crate::config::{CatalogConfig, SessionConfig};
    use crate::constants::{invoke_error, DbType, RequestCode};
    use crate::row::Row;
    use crate::transport::StreamTransport;
    use crate::types::Value;

    /// Catalog that knows no code at all
    struct EmptyCatalog;

    #[async_trait::async_trait]
    impl SqlConnection for EmptyCatalog {
        async fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    fn context() -> InvocationContext<EmptyCatalog> {
        let (a, _b) = tokio::io::duplex(64);
        let resolver = CodeResolver::new(
            CodeRepository::new(EmptyCatalog, CatalogConfig::new()),
            Arc::new(ClassCache::new()),
        );
        let session = Session::new(StreamTransport::new(a), SessionConfig::default());
        InvocationContext::new(Arc::new(resolver), session)
    }

    #[tokio::test]
    async fn test_unknown_procedure_is_reported() {
        let ctx = context();
        let request = InvokeRequest {
            signature: "com.acme.Missing.run()".to_string(),
            args: vec![],
            return_type: DbType::Int,
        };
        let outcome = ctx.prepare_invocation(request).await;
        assert!(matches!(outcome, Err(ref e) if e.is_not_found()));

        let frame = ctx.reply(outcome.map(|_| InvokeResult::default())).unwrap();
        assert_eq!(frame.code, RequestCode::Error as i32);
        let error = InvokeError::decode(frame.body).unwrap();
        assert_eq!(error.kind, invoke_error::NO_SUCH_CODE);
    }

    #[tokio::test]
    async fn test_bad_signature_is_reported() {
        let ctx = context();
        let request = InvokeRequest {
            signature: "run".to_string(),
            args: vec![],
            return_type: DbType::Null,
        };
        assert!(matches!(
            ctx.prepare_invocation(request).await,
            Err(crate::error::Error::InvalidSignature(_))
        ));
    }

    #[tokio::test]
    async fn test_result_reply() {
        let ctx = context();
        let result = InvokeResult {
            value: Value::from("done"),
            out_args: vec![Value::Int(3)],
        };
        let frame = ctx.reply(Ok(result.clone())).unwrap();
        assert_eq!(frame.code, RequestCode::Result as i32);
        assert_eq!(InvokeResult::decode(&frame).unwrap(), result);
        assert!(ctx.cache().is_empty());
    }
}
