use bootseq_config::SignatureSet;

/// How an initialization failure should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A recognised optional capability is unavailable on this platform.
    OptionalCapabilityUnavailable {
        /// Capability that is missing.
        capability: String,
    },
    /// Anything else.
    Fatal,
}

/// Maps an error message to a [`Classification`].
///
/// Implementations must be pure functions of the message.
pub trait ErrorClassifier {
    /// Classifies `message`.
    fn classify(&self, message: &str) -> Classification;
}

impl<T> ErrorClassifier for Box<T>
where
    T: ErrorClassifier + ?Sized,
{
    fn classify(&self, message: &str) -> Classification {
        (**self).classify(message)
    }
}

/// Classifier backed by the boot profile's degradation signatures.
#[derive(Debug, Clone, Default)]
pub struct SignatureClassifier {
    signatures: SignatureSet,
}

impl SignatureClassifier {
    /// Builds a classifier over `signatures`.
    #[must_use]
    pub fn new(signatures: SignatureSet) -> Self {
        Self { signatures }
    }
}

impl ErrorClassifier for SignatureClassifier {
    fn classify(&self, message: &str) -> Classification {
        self.signatures
            .matching(message)
            .map_or(Classification::Fatal, |signature| {
                Classification::OptionalCapabilityUnavailable {
                    capability: signature.capability.clone(),
                }
            })
    }
}
