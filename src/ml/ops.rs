use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AvgPool2d, AvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};

use crate::domain::traits::{HistoryLayer, Transform};

/// Max or average pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Max,
    Avg,
}

fn same_padding(kernel: usize) -> PaddingConfig2d {
    PaddingConfig2d::Explicit(kernel / 2, kernel / 2)
}

// Stride 1 pools keep the resolution, stride == kernel pools reduce it.
fn pool_pair(
    kind:    PoolKind,
    kernel:  usize,
    stride:  usize,
    padding: PaddingConfig2d,
) -> (Option<MaxPool2d>, Option<AvgPool2d>) {
    match kind {
        PoolKind::Max => (
            Some(
                MaxPool2dConfig::new([kernel, kernel])
                    .with_strides([stride, stride])
                    .with_padding(padding)
                    .init(),
            ),
            None,
        ),
        PoolKind::Avg => (
            None,
            Some(
                AvgPool2dConfig::new([kernel, kernel])
                    .with_strides([stride, stride])
                    .with_padding(padding)
                    .init(),
            ),
        ),
    }
}

fn apply_pool<B: Backend>(
    max: &Option<MaxPool2d>,
    avg: &Option<AvgPool2d>,
    x:   Tensor<B, 4>,
) -> Tensor<B, 4> {
    match (max, avg) {
        (Some(pool), _)    => pool.forward(x),
        (None, Some(pool)) => pool.forward(x),
        (None, None)       => x,
    }
}

// ─── Stem ─────────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct Stem<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn:   BatchNorm<B, 2>,
}

impl<B: Backend> Stem<B> {
    pub fn new(in_channels: usize, out_filters: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_filters], [3, 3])
            .with_padding(same_padding(3))
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(out_filters).init(device);
        Self { conv, bn }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.bn.forward(self.conv.forward(x))
    }
}

impl<B: Backend> Transform<Tensor<B, 4>> for Stem<B> {
    fn apply(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(x)
    }
}

// ─── StdConv ──────────────────────────────────────────────────────────────────
/// 1x1 conv → batch norm → ReLU. Every candidate op starts with one.
#[derive(Module, Debug)]
pub struct StdConv<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn:   BatchNorm<B, 2>,
}

impl<B: Backend> StdConv<B> {
    pub fn new(c_in: usize, c_out: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([c_in, c_out], [1, 1])
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(c_out).init(device);
        Self { conv, bn }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        relu(self.bn.forward(self.conv.forward(x)))
    }
}

// ─── ConvBranch ───────────────────────────────────────────────────────────────
/// StdConv → k×k conv → batch norm → ReLU.
///
/// The separable variant replaces the k×k conv with a depthwise
/// k×k conv followed by a pointwise 1x1 conv.
#[derive(Module, Debug)]
pub struct ConvBranch<B: Backend> {
    pub preproc:   StdConv<B>,
    pub conv:      Conv2d<B>,
    pub pointwise: Option<Conv2d<B>>,
    pub bn:        BatchNorm<B, 2>,
}

impl<B: Backend> ConvBranch<B> {
    pub fn new(channels: usize, kernel: usize, separable: bool, device: &B::Device) -> Self {
        let preproc = StdConv::new(channels, channels, device);
        let (conv, pointwise) = if separable {
            let depthwise = Conv2dConfig::new([channels, channels], [kernel, kernel])
                .with_padding(same_padding(kernel))
                .with_groups(channels)
                .with_bias(false)
                .init(device);
            let pointwise = Conv2dConfig::new([channels, channels], [1, 1])
                .with_bias(false)
                .init(device);
            (depthwise, Some(pointwise))
        } else {
            let conv = Conv2dConfig::new([channels, channels], [kernel, kernel])
                .with_padding(same_padding(kernel))
                .init(device);
            (conv, None)
        };
        let bn = BatchNormConfig::new(channels).init(device);
        Self { preproc, conv, pointwise, bn }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(self.preproc.forward(x));
        let x = match &self.pointwise {
            Some(pointwise) => pointwise.forward(x),
            None            => x,
        };
        relu(self.bn.forward(x))
    }
}

// ─── PoolBranch ───────────────────────────────────────────────────────────────
/// StdConv → k×k pooling (stride 1, same padding) → batch norm.
#[derive(Module, Debug)]
pub struct PoolBranch<B: Backend> {
    pub preproc: StdConv<B>,
    pub max:     Option<MaxPool2d>,
    pub avg:     Option<AvgPool2d>,
    pub bn:      BatchNorm<B, 2>,
}

impl<B: Backend> PoolBranch<B> {
    pub fn new(channels: usize, kind: PoolKind, kernel: usize, device: &B::Device) -> Self {
        let preproc    = StdConv::new(channels, channels, device);
        let (max, avg) = pool_pair(kind, kernel, 1, same_padding(kernel));
        let bn         = BatchNormConfig::new(channels).init(device);
        Self { preproc, max, avg, bn }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = apply_pool(&self.max, &self.avg, self.preproc.forward(x));
        self.bn.forward(x)
    }
}

// ─── CandidateOp ──────────────────────────────────────────────────────────────
/// The operation a layer settled on: exactly one branch is set.
#[derive(Module, Debug)]
pub struct CandidateOp<B: Backend> {
    pub conv: Option<ConvBranch<B>>,
    pub pool: Option<PoolBranch<B>>,
}

impl<B: Backend> CandidateOp<B> {
    pub fn conv(branch: ConvBranch<B>) -> Self {
        Self { conv: Some(branch), pool: None }
    }

    pub fn pool(branch: PoolBranch<B>) -> Self {
        Self { conv: None, pool: Some(branch) }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match (&self.conv, &self.pool) {
            (Some(branch), _)    => branch.forward(x),
            (None, Some(branch)) => branch.forward(x),
            (None, None)         => x,
        }
    }
}

// ─── EnasLayer ────────────────────────────────────────────────────────────────
/// One searched layer.
///
///   out = op(history.last()) + Σ history[skip]
///   out = batch_norm(out)
#[derive(Module, Debug)]
pub struct EnasLayer<B: Backend> {
    pub op:   CandidateOp<B>,
    pub skip: Vec<usize>,
    pub bn:   BatchNorm<B, 2>,
}

impl<B: Backend> EnasLayer<B> {
    pub fn new(op: CandidateOp<B>, skip: Vec<usize>, channels: usize, device: &B::Device) -> Self {
        let bn = BatchNormConfig::new(channels).init(device);
        Self { op, skip, bn }
    }
}

impl<B: Backend> HistoryLayer<Tensor<B, 4>> for EnasLayer<B> {
    fn apply(&self, history: &[Tensor<B, 4>]) -> Tensor<B, 4> {
        // The graph always seeds the history with the stem output.
        let prev = history.len() - 1;
        let mut out = self.op.forward(history[prev].clone());
        for &i in &self.skip {
            out = out + history[i].clone();
        }
        self.bn.forward(out)
    }
}

// ─── FactorizedReduce ─────────────────────────────────────────────────────────
/// Halves height and width, keeps the channel count.
///
/// Two stride-2 1x1 convs each produce half the channels, the
/// second one on the input shifted by one pixel, so together they
/// see every spatial position.
#[derive(Module, Debug)]
pub struct FactorizedReduce<B: Backend> {
    pub conv1: Conv2d<B>,
    pub conv2: Conv2d<B>,
    pub bn:    BatchNorm<B, 2>,
}

impl<B: Backend> FactorizedReduce<B> {
    /// `channels` must be even.
    pub fn new(channels: usize, device: &B::Device) -> Self {
        let half  = channels / 2;
        let conv1 = Conv2dConfig::new([channels, half], [1, 1])
            .with_stride([2, 2])
            .with_bias(false)
            .init(device);
        let conv2 = Conv2dConfig::new([channels, half], [1, 1])
            .with_stride([2, 2])
            .with_bias(false)
            .init(device);
        let bn = BatchNormConfig::new(channels).init(device);
        Self { conv1, conv2, bn }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let [n, c, h, w] = x.dims();
        let shifted = x.clone().slice([0..n, 0..c, 1..h, 1..w]);
        let out = Tensor::cat(vec![self.conv1.forward(x), self.conv2.forward(shifted)], 1);
        self.bn.forward(out)
    }
}

// ─── ReductionOp ──────────────────────────────────────────────────────────────
/// What runs over the history at a pooling checkpoint.
#[derive(Module, Debug)]
pub struct ReductionOp<B: Backend> {
    pub factorized: Option<FactorizedReduce<B>>,
    pub max:        Option<MaxPool2d>,
    pub avg:        Option<AvgPool2d>,
}

impl<B: Backend> ReductionOp<B> {
    pub fn factorized(channels: usize, device: &B::Device) -> Self {
        Self {
            factorized: Some(FactorizedReduce::new(channels, device)),
            max:        None,
            avg:        None,
        }
    }

    /// 2x2 pooling with stride 2.
    pub fn pool(kind: PoolKind) -> Self {
        let (max, avg) = pool_pair(kind, 2, 2, PaddingConfig2d::Valid);
        Self { factorized: None, max, avg }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        match &self.factorized {
            Some(reduce) => reduce.forward(x),
            None         => apply_pool(&self.max, &self.avg, x),
        }
    }
}

impl<B: Backend> Transform<Tensor<B, 4>> for ReductionOp<B> {
    fn apply(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.forward(x)
    }
}
