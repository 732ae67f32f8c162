use burn::tensor::{backend::Backend, BasicOps, Data, Float, Int, Shape, Tensor};

use super::Image;

/// A trait for converting batches of items to tensors
///
/// Implemented for the batches produced by the [`ObssPreprocessor`](super::ObssPreprocessor):
/// a `Vec` of [`Image`]s becomes a `[n, h, w, c]` float tensor and a padded [`InstrBatch`]
/// becomes a `[n, max_len]` int tensor.
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B> = Float> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

/// Instructions encoded as token ids and zero-padded to a common length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrBatch {
    ids: Vec<i32>,
    len: usize,
    width: usize,
}

impl InstrBatch {
    /// Pad every instruction with zeros to the length of the longest one
    pub fn pad(instrs: &[Vec<u32>]) -> Self {
        let width = instrs.iter().map(Vec::len).max().unwrap_or(0);
        let mut ids = vec![0; instrs.len() * width];
        for (row, instr) in ids.chunks_mut(width.max(1)).zip(instrs) {
            for (slot, &id) in row.iter_mut().zip(instr) {
                *slot = id as i32;
            }
        }
        Self {
            ids,
            len: instrs.len(),
            width,
        }
    }

    /// `[number of instructions, longest instruction length]`
    pub fn shape(&self) -> [usize; 2] {
        [self.len, self.width]
    }

    pub fn ids(&self) -> &[i32] {
        &self.ids
    }
}

impl<B: Backend> ToTensor<B, 2, Int> for InstrBatch {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2, Int> {
        let shape = Shape::new(self.shape());
        Tensor::from_ints(Data::new(self.ids, shape), device)
    }
}

impl<B: Backend> ToTensor<B, 4> for Vec<Image> {
    /// All images are expected to share the shape of the first one
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 4> {
        let [h, w, c] = self.first().map(|img| img.shape).unwrap_or([0, 0, 0]);
        let n = self.len();
        let values = self
            .into_iter()
            .flat_map(|img| img.data)
            .collect::<Vec<f32>>();
        Tensor::from_floats(Data::new(values, Shape::new([n, h, w, c])), device)
    }
}
