use super::weights::GruWeights;
use crate::utils::sigmoid_inplace;
use ndarray::{s, Array2, ArrayView2, Zip};

impl GruWeights {
    pub fn hidden_size(&self) -> usize {
        self.ux.nrows()
    }

    /// One GRU transition for a batch.
    ///
    /// `x` is `[n, input]`, `h` is `[n, H]`; returns the next `[n, H]` state.
    /// Rows never mix.
    pub fn step(&self, x: ArrayView2<'_, f32>, h: ArrayView2<'_, f32>) -> Array2<f32> {
        let hidden = self.hidden_size();

        let mut gates = x.dot(&self.w) + &self.b + h.dot(&self.u);
        sigmoid_inplace(&mut gates);
        let reset = gates.slice(s![.., ..hidden]);
        let update = gates.slice(s![.., hidden..]);

        let mut next = x.dot(&self.wx) + &self.bx + &(&reset * &h.dot(&self.ux));
        next.mapv_inplace(f32::tanh);

        // h' = u * h + (1 - u) * candidate
        Zip::from(&mut next)
            .and(&update)
            .and(&h)
            .for_each(|c, &u, &prev| *c = u * prev + (1.0 - u) * *c);
        next
    }
}
