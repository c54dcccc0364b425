//! Minting a new token into a collection.
//!
//! [`MintDraft`] is the user's form; [`MintDraft::validate`] checks it without
//! any I/O. [`MintWorkflow`] then drives the external services behind
//! [`MintBackend`] (wallet, storage gateway, contracts) in order, reporting
//! progress on an mpsc channel.
//!
//! The explorer binary does not mint. This module is library surface for
//! front ends that own a wallet connection: they implement [`MintBackend`]
//! over their chain and storage clients, build a [`MintDraft`] from their
//! form, and await [`MintWorkflow::run`] while rendering [`MintProgress`].

use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// Largest accepted image, in bytes (15 MiB).
pub const MAX_IMAGE_BYTES: usize = 15 * 1024 * 1024;

pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "png", "gif", "webp"];
pub const MEDIA_EXTENSIONS: [&str; 3] = ["glb", "mp4", "mp3"];

/// Chains minting is allowed on unless configured otherwise.
pub const DEFAULT_MINT_CHAINS: [u64; 2] = [888, 999];

const SIGNATURE_PREFIX: &str = "Approve Signature on OpenZoo.io with nonce";

#[derive(Debug, Error)]
pub enum MintError {
    #[error("Connect your wallet first")]
    NotConnected,
    #[error("Minting is not available on chain {0}")]
    UnsupportedChain(u64),
    #[error("Name is required")]
    MissingName,
    #[error("An image is required")]
    MissingImage,
    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),
    #[error("Image is {0} bytes, the limit is 15 MiB")]
    ImageTooLarge(usize),
    #[error("Unsupported media type: {0}")]
    UnsupportedMedia(String),
    #[error("Supply must be at least 1")]
    InvalidSupply,
    #[error("Balance of {balance} wei is below the platform fee of {fee} wei")]
    InsufficientBalance { balance: u128, fee: u128 },
    #[error("Account is banned from minting")]
    Banned,
    #[error("Signature request was rejected")]
    SignatureRejected,
    #[error("{step} failed: {message}")]
    Backend { step: &'static str, message: String },
}

impl MintError {
    pub fn backend(step: &'static str, message: impl Into<String>) -> Self {
        MintError::Backend {
            step,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenStandard {
    /// One token per mint (ERC-721).
    #[default]
    Single,
    /// A supply of interchangeable tokens (ERC-1155).
    Multi,
}

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercased extension, without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }
}

/// The connected wallet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MintSession {
    pub account: Option<String>,
    pub chain_id: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct MintDraft {
    /// Collection contract the token is minted into.
    pub collection: String,
    pub standard: TokenStandard,
    pub name: String,
    pub symbol: String,
    pub description: String,
    /// Royalty as typed, a percentage such as `"2.5"`.
    pub royalty: String,
    /// Free-form extra metadata.
    pub extra: String,
    /// Only used for [`TokenStandard::Multi`].
    pub supply: u64,
    pub image: Option<MediaFile>,
    /// Animation shown in place of the image.
    pub media: Option<MediaFile>,
    /// Content revealed only to the owner.
    pub unlockable: Option<String>,
}

impl MintDraft {
    /// Checks the draft against the connected wallet.
    pub fn validate(&self, session: &MintSession, allowed_chains: &[u64]) -> Result<(), MintError> {
        if session.account.as_deref().map_or(true, str::is_empty) {
            return Err(MintError::NotConnected);
        }
        match session.chain_id {
            Some(chain) if allowed_chains.contains(&chain) => {}
            Some(chain) => return Err(MintError::UnsupportedChain(chain)),
            None => return Err(MintError::NotConnected),
        }
        if self.name.trim().is_empty() {
            return Err(MintError::MissingName);
        }

        let image = self.image.as_ref().ok_or(MintError::MissingImage)?;
        let ext = image.extension().unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Err(MintError::UnsupportedImage(image.file_name.clone()));
        }
        if image.size() > MAX_IMAGE_BYTES {
            return Err(MintError::ImageTooLarge(image.size()));
        }

        if let Some(media) = &self.media {
            let ext = media.extension().unwrap_or_default();
            if !MEDIA_EXTENSIONS.contains(&ext.as_str()) {
                return Err(MintError::UnsupportedMedia(media.file_name.clone()));
            }
        }

        if self.standard == TokenStandard::Multi && self.supply == 0 {
            return Err(MintError::InvalidSupply);
        }
        Ok(())
    }

    pub fn royalty_bps(&self) -> u16 {
        parse_royalty_bps(&self.royalty)
    }

    fn unlockable_content(&self) -> Option<&str> {
        self.unlockable.as_deref().filter(|c| !c.is_empty())
    }
}

/// Converts a royalty percentage to basis points.
///
/// Accepts up to two decimals and an optional `%`; values above 100 are
/// clamped and anything unparseable is 0.
///
/// Unlike the marketplace web form, which truncates to whole percent before
/// scaling (`"2.5"` becomes 200), the fraction is kept: `"2.5"` is 250.
pub fn parse_royalty_bps(input: &str) -> u16 {
    let trimmed = input.trim().trim_end_matches('%').trim();
    match trimmed.parse::<f64>() {
        Ok(pct) if pct.is_finite() && pct > 0.0 => (pct.min(100.0) * 100.0).round() as u16,
        _ => 0,
    }
}

/// Metadata uploaded to the storage gateway; its hash becomes the token URI.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenMetadata<'a> {
    pub account: &'a str,
    pub name: &'a str,
    pub symbol: &'a str,
    pub description: &'a str,
    pub extra: &'a str,
    pub royalty_bps: u16,
    pub image: &'a MediaFile,
    pub animation_url: Option<String>,
}

/// Arguments of the collection contract's `mint` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCall {
    pub collection: String,
    pub to: String,
    pub standard: TokenStandard,
    pub supply: u64,
    pub token_uri: String,
    /// Platform fee attached to the transaction.
    pub value_wei: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedMessage {
    pub signature: String,
    pub signer: String,
}

/// Wallet, storage and contract services used while minting.
pub trait MintBackend: Send + Sync {
    fn balance(&self, account: &str) -> impl Future<Output = Result<u128, MintError>> + Send;

    fn platform_fee(&self, collection: &str)
        -> impl Future<Output = Result<u128, MintError>> + Send;

    fn is_banned(&self, account: &str) -> impl Future<Output = Result<bool, MintError>> + Send;

    fn unlockable_nonce(&self, account: &str)
        -> impl Future<Output = Result<u64, MintError>> + Send;

    fn sign_message(
        &self,
        message: &str,
    ) -> impl Future<Output = Result<SignedMessage, MintError>> + Send;

    /// Uploads the animation file and returns its URL.
    fn upload_media(&self, media: &MediaFile)
        -> impl Future<Output = Result<String, MintError>> + Send;

    /// Uploads image and metadata, returning the metadata hash.
    fn upload_metadata(
        &self,
        metadata: &TokenMetadata<'_>,
    ) -> impl Future<Output = Result<String, MintError>> + Send;

    /// Submits the mint transaction and returns its hash.
    fn submit_mint(&self, call: &MintCall) -> impl Future<Output = Result<String, MintError>> + Send;

    /// Waits for the transaction and returns the minted token id.
    fn wait_minted(
        &self,
        tx_hash: &str,
        standard: TokenStandard,
    ) -> impl Future<Output = Result<u64, MintError>> + Send;

    fn register_royalty(
        &self,
        collection: &str,
        token_id: u64,
        royalty_bps: u16,
    ) -> impl Future<Output = Result<(), MintError>> + Send;

    fn add_unlockable(
        &self,
        collection: &str,
        token_id: u64,
        content: &str,
        signed: &SignedMessage,
    ) -> impl Future<Output = Result<(), MintError>> + Send;
}

/// Stages shown while a mint is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintStep {
    Uploading,
    Creating,
    Confirming,
    Done,
}

impl MintStep {
    pub fn label(self) -> &'static str {
        match self {
            MintStep::Uploading => "Uploading to IPFS",
            MintStep::Creating => "Create your NFT",
            MintStep::Confirming => "Confirming the Transaction",
            MintStep::Done => "Done",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintProgress {
    Step(MintStep),
    Submitted { tx_hash: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub collection: String,
    pub token_id: u64,
    pub tx_hash: String,
}

pub struct MintWorkflow<B> {
    backend: B,
    allowed_chains: Vec<u64>,
}

impl<B: MintBackend> MintWorkflow<B> {
    pub fn new(backend: B, allowed_chains: Vec<u64>) -> Self {
        Self {
            backend,
            allowed_chains,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Validates `draft` and mints it.
    ///
    /// Progress goes to `progress`; a closed receiver does not stop the mint.
    pub async fn run(
        &self,
        session: &MintSession,
        draft: &MintDraft,
        progress: &mpsc::Sender<MintProgress>,
    ) -> Result<MintReceipt, MintError> {
        draft.validate(session, &self.allowed_chains)?;
        let account = session.account.as_deref().ok_or(MintError::NotConnected)?;
        let image = draft.image.as_ref().ok_or(MintError::MissingImage)?;

        let fee = match self.backend.platform_fee(&draft.collection).await {
            Ok(fee) => fee,
            Err(e) => {
                tracing::warn!(error = %e, collection = %draft.collection, "Platform fee unavailable, assuming none");
                0
            }
        };
        let balance = self.backend.balance(account).await?;
        if balance < fee {
            return Err(MintError::InsufficientBalance { balance, fee });
        }
        if self.backend.is_banned(account).await? {
            return Err(MintError::Banned);
        }

        let signed = match draft.unlockable_content() {
            Some(_) => {
                let nonce = self.backend.unlockable_nonce(account).await?;
                let message = format!("{} {}", SIGNATURE_PREFIX, nonce);
                let signed = self
                    .backend
                    .sign_message(&message)
                    .await
                    .map_err(|_| MintError::SignatureRejected)?;
                Some(signed)
            }
            None => None,
        };

        report(progress, MintProgress::Step(MintStep::Uploading)).await;
        let animation_url = match &draft.media {
            Some(media) => Some(self.backend.upload_media(media).await?),
            None => None,
        };
        let royalty_bps = draft.royalty_bps();
        let metadata = TokenMetadata {
            account,
            name: draft.name.trim(),
            symbol: &draft.symbol,
            description: &draft.description,
            extra: &draft.extra,
            royalty_bps,
            image,
            animation_url,
        };
        let token_uri = self.backend.upload_metadata(&metadata).await?;

        let call = MintCall {
            collection: draft.collection.clone(),
            to: account.to_string(),
            standard: draft.standard,
            supply: match draft.standard {
                TokenStandard::Single => 1,
                TokenStandard::Multi => draft.supply,
            },
            token_uri,
            value_wei: fee,
        };
        let tx_hash = self.backend.submit_mint(&call).await?;
        report(progress, MintProgress::Step(MintStep::Creating)).await;
        report(
            progress,
            MintProgress::Submitted {
                tx_hash: tx_hash.clone(),
            },
        )
        .await;

        report(progress, MintProgress::Step(MintStep::Confirming)).await;
        let token_id = self.backend.wait_minted(&tx_hash, draft.standard).await?;
        report(progress, MintProgress::Step(MintStep::Done)).await;
        tracing::info!(collection = %draft.collection, token_id, %tx_hash, "Token minted");

        self.backend
            .register_royalty(&draft.collection, token_id, royalty_bps)
            .await?;

        if let (Some(content), Some(signed)) = (draft.unlockable_content(), &signed) {
            self.backend
                .add_unlockable(&draft.collection, token_id, content, signed)
                .await?;
        }

        Ok(MintReceipt {
            collection: draft.collection.clone(),
            token_id,
            tx_hash,
        })
    }
}

async fn report(progress: &mpsc::Sender<MintProgress>, update: MintProgress) {
    if progress.send(update).await.is_err() {
        tracing::debug!("Mint progress receiver dropped");
    }
}
