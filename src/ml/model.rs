// ============================================================
// Layer 5 — Mask Estimator
// ============================================================
// The network behind the training loop.
//
//   x    [b, c, bins, frames]
//    │   encoder levels: 3x3 conv, then stride-2 3x3 conv
//    ▼
//   bottleneck (2x the deepest width)
//    │   decoder levels: upsample to the skip, concat, 3x3 conv
//    ▼
//   1x1 head + sigmoid → mask, cropped by `offset` frames per side

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::{
        activation::{relu, sigmoid},
        module::interpolate,
        ops::{InterpolateMode, InterpolateOptions},
    },
};

/// What the training loop needs from a separation network.
///
/// `forward` maps a mixture spectrogram batch `[b, c, bins, frames]` to a
/// soft mask in `[0, 1]` that is `2 * offset()` frames narrower in time.
/// Inference mode comes from `AutodiffModule::valid`, gradients from the
/// autodiff backend, so neither needs a method here.
pub trait MaskEstimator<B: Backend>: Module<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4>;

    /// Frames trimmed from each time border of the mask.
    fn offset(&self) -> usize;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct UNetConfig {
    #[config(default = 2)]
    pub in_channels:   usize,
    #[config(default = 16)]
    pub base_channels: usize,
    #[config(default = 4)]
    pub depth:         usize,
    #[config(default = 32)]
    pub offset:        usize,
}

impl UNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet<B> {
        let base = self.base_channels;

        let encoders: Vec<EncoderBlock<B>> = (0..self.depth)
            .map(|i| {
                let c_in = if i == 0 { self.in_channels } else { base << (i - 1) };
                EncoderBlock::new(c_in, base << i, device)
            })
            .collect();

        // The bottleneck doubles the deepest width; every decoder then sees
        // 2x channels from below plus 1x from its skip.
        let deepest    = base << self.depth.saturating_sub(1);
        let bottleneck = conv3x3(deepest, base << self.depth, 1, device);

        let decoders: Vec<DecoderBlock<B>> = (0..self.depth)
            .rev()
            .map(|i| DecoderBlock::new(3 * (base << i), base << i, device))
            .collect();

        let head = Conv2dConfig::new([base, self.in_channels], [1, 1]).init(device);

        UNet { encoders, bottleneck, decoders, head, offset: self.offset }
    }
}

fn conv3x3<B: Backend>(c_in: usize, c_out: usize, stride: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([c_in, c_out], [3, 3])
        .with_stride([stride, stride])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub down: Conv2d<B>,
}

impl<B: Backend> EncoderBlock<B> {
    fn new(c_in: usize, c_out: usize, device: &B::Device) -> Self {
        Self {
            conv: conv3x3(c_in, c_out, 1, device),
            down: conv3x3(c_out, c_out, 2, device),
        }
    }

    /// Returns (skip, downsampled); stride 2 gives ceil(n / 2) on both axes.
    pub fn forward(&self, x: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>) {
        let skip = relu(self.conv.forward(x));
        let down = relu(self.down.forward(skip.clone()));
        (skip, down)
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub conv: Conv2d<B>,
}

impl<B: Backend> DecoderBlock<B> {
    fn new(c_in: usize, c_out: usize, device: &B::Device) -> Self {
        Self { conv: conv3x3(c_in, c_out, 1, device) }
    }

    /// Upsample to the skip's extent, concatenate on channels, convolve.
    pub fn forward(&self, x: Tensor<B, 4>, skip: Tensor<B, 4>) -> Tensor<B, 4> {
        let [_, _, h, w] = skip.dims();
        let up = interpolate(x, [h, w], InterpolateOptions::new(InterpolateMode::Nearest));
        relu(self.conv.forward(Tensor::cat(vec![up, skip], 1)))
    }
}

#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    pub encoders:   Vec<EncoderBlock<B>>,
    pub bottleneck: Conv2d<B>,
    pub decoders:   Vec<DecoderBlock<B>>,
    pub head:       Conv2d<B>,
    pub offset:     usize,
}

impl<B: Backend> MaskEstimator<B> for UNet<B> {
    /// x: [batch, channels, bins, frames] → mask: [batch, channels, bins, frames - 2 * offset]
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut skips = Vec::with_capacity(self.encoders.len());
        let mut h     = x;
        for enc in &self.encoders {
            let (skip, down) = enc.forward(h);
            skips.push(skip);
            h = down;
        }

        h = relu(self.bottleneck.forward(h));

        // Decoders run deepest first, so they consume the skips in reverse
        for (dec, skip) in self.decoders.iter().zip(skips.into_iter().rev()) {
            h = dec.forward(h, skip);
        }

        let mask = sigmoid(self.head.forward(h));
        if self.offset == 0 {
            return mask;
        }
        let [b, c, f, t] = mask.dims();
        mask.slice([0..b, 0..c, 0..f, self.offset..t - self.offset])
    }

    fn offset(&self) -> usize {
        self.offset
    }
}
